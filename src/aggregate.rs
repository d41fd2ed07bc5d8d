use crate::handler::HandlerRegistry;
use crate::DomainEvent;

/// The Aggregate trait is responsible for binding event handlers onto its state and for
/// validating commands, mapping them to events.
///
/// The implementing type is the in-memory state of one entity: it is built with [`Default`] and
/// mutated only by the handlers it registers.
pub trait Aggregate: Default + Send + Sync + 'static {
    /// Type tag of the entities backing this aggregate. Used as the log space by stream stores.
    const NAME: &'static str;
    type Command: Send;
    type Error: std::error::Error;

    /// Binds an apply function for every event this aggregate reacts to. Called once when
    /// the handlers of the aggregate are built.
    ///
    /// # Errors
    ///
    /// Registering the same discriminator twice is a wiring defect and fails with
    /// [`AggregateError::DuplicateHandler`].
    fn register_handlers(handlers: &mut HandlerRegistry<Self>) -> Result<(), AggregateError>;

    /// Handles, validate a command and emits events.
    ///
    /// If the command is not valid an error is returned. The returned events are raised on the
    /// aggregate in order.
    fn handle_command(&self, command: Self::Command) -> Result<Vec<DomainEvent>, Self::Error>;
}

/// Wiring defects between events and the handlers of an aggregate.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum AggregateError {
    #[error("handler for event `{0}` already registered")]
    DuplicateHandler(String),
    #[error("handler for event `{discriminator}` expects `{expected}` but received `{found}`")]
    HandlerTypeMismatch {
        discriminator: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("no handler registered for event `{0}`")]
    EventHandlerNotFound(String),
}
