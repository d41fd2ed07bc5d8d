use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::EventRegistry;
use crate::store::EventStoreError;
use crate::{DomainEvent, EventMetadata};

/// Self-describing representation of a [`DomainEvent`] on the log.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Envelope {
    pub discriminator: String,
    pub metadata: EventMetadata,
    pub payload: Value,
}

impl Envelope {
    pub fn seal(event: &DomainEvent) -> Result<Self, serde_json::Error> {
        Ok(Self {
            discriminator: event.discriminator().to_string(),
            metadata: event.metadata().clone(),
            payload: event.payload().to_json()?,
        })
    }

    /// Rebuilds the domain event, decoding the payload through the registry.
    pub fn open(self, registry: &EventRegistry) -> Result<DomainEvent, EventStoreError> {
        let payload = registry.decode(&self.discriminator, self.payload)?;
        Ok(DomainEvent::from_parts(self.metadata, payload))
    }
}
