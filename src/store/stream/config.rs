use std::time::Duration;

use typed_builder::TypedBuilder;

use crate::registry::EventRegistry;

#[derive(TypedBuilder, Debug)]
pub struct StreamStoreConfig {
    /// Decoders for every event that may be read back from the log.
    pub(crate) registry: EventRegistry,
    /// The maximum time granted to a single produce or consume round-trip against the log.
    /// Unbounded if not set.
    #[builder(default, setter(strip_option))]
    pub(crate) request_timeout: Option<Duration>,
}
