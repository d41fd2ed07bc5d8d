use std::ops::Deref;
use std::time::Duration;

use async_trait::async_trait;

pub use memory::InMemoryEventStore;

use crate::types::SequenceNumber;
use crate::{DomainEvent, Entity};

mod memory;
#[cfg(feature = "stream")]
pub mod stream;

/// An EventStore is responsible for persisting the events raised by an aggregate, and loading the
/// events that represent an entity's history.
///
/// Writes follow an optimistic concurrency strategy: a batch is appended only if the stream of
/// the entity currently ends at the expected sequence.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends already sequenced events to the stream of the entity. This is atomic - either all
    /// the events are appended, or none are.
    ///
    /// # Errors
    ///
    /// Fails with [`EventStoreError::Concurrency`] if the stream does not end at
    /// `expected_sequence`, and with [`EventStoreError::InvalidSequence`] if the events are not
    /// numbered `expected_sequence + 1`, `expected_sequence + 2`, ...
    async fn save_events(
        &self,
        entity: &Entity,
        events: &[DomainEvent],
        expected_sequence: SequenceNumber,
    ) -> Result<(), EventStoreError>;

    /// Loads the events of the entity having a sequence greater or equal than `min_sequence`,
    /// by ascending sequence.
    ///
    /// An entity without events yields an empty list.
    async fn load_events(
        &self,
        entity: &Entity,
        min_sequence: SequenceNumber,
    ) -> Result<Vec<DomainEvent>, EventStoreError>;
}

/// Blanket implementation making an [`EventStore`] every (smart) pointer to an [`EventStore`],
/// e.g. `&Store`, `Box<Store>`, `Arc<Store>`, `Box<dyn EventStore>`.
#[async_trait]
impl<S, T> EventStore for T
where
    S: EventStore + ?Sized,
    T: Deref<Target = S> + Send + Sync,
{
    /// Deref call to [`EventStore::save_events`].
    async fn save_events(
        &self,
        entity: &Entity,
        events: &[DomainEvent],
        expected_sequence: SequenceNumber,
    ) -> Result<(), EventStoreError> {
        self.deref().save_events(entity, events, expected_sequence).await
    }

    /// Deref call to [`EventStore::load_events`].
    async fn load_events(
        &self,
        entity: &Entity,
        min_sequence: SequenceNumber,
    ) -> Result<Vec<DomainEvent>, EventStoreError> {
        self.deref().load_events(entity, min_sequence).await
    }
}

#[derive(thiserror::Error, Debug)]
pub enum EventStoreError {
    /// Reserved for stores distinguishing the creation of a stream from appends to it.
    #[error("entity {0} already exists")]
    AlreadyExists(Entity),
    /// Reserved: the stores of this crate load missing streams as empty.
    #[error("entity {0} not found")]
    NotFound(Entity),
    #[error(
        "concurrency conflict on {entity}: expected sequence {expected}, found {actual}; reload the aggregate and retry"
    )]
    Concurrency {
        entity: Entity,
        expected: SequenceNumber,
        actual: SequenceNumber,
    },
    #[error("invalid event type `{0}`")]
    InvalidEventType(String),
    #[error("event of {entity} out of sequence: expected {expected}, found {found}")]
    InvalidSequence {
        entity: Entity,
        expected: SequenceNumber,
        found: SequenceNumber,
    },
    /// Serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Error returned by the underlying log client.
    #[error(transparent)]
    Stream(Box<dyn std::error::Error + Send + Sync>),
    #[error("log request timed out after {0:?}")]
    Timeout(Duration),
}

impl EventStoreError {
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Concurrency { .. })
    }
}

/// Checks the events continue the stream right after `expected_sequence`, without gaps.
pub(crate) fn check_sequence(
    entity: &Entity,
    events: &[DomainEvent],
    expected_sequence: SequenceNumber,
) -> Result<(), EventStoreError> {
    for (expected, event) in (expected_sequence + 1..).zip(events) {
        if event.sequence() != expected {
            return Err(EventStoreError::InvalidSequence {
                entity: entity.clone(),
                expected,
                found: event.sequence(),
            });
        }
    }
    Ok(())
}
