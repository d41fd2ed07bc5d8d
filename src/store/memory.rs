use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::store::{check_sequence, EventStore, EventStoreError};
use crate::types::SequenceNumber;
use crate::{DomainEvent, Entity};

/// In-memory [`EventStore`], meant for tests and local development. Nothing survives the process.
///
/// Streams live in a sharded map: an append holds the write lock of the shard owning the entity
/// while checking the expected sequence, so writers of the same entity are serialized while
/// unrelated entities and readers proceed independently.
///
/// The store is protected by an [`Arc`] that allows it to be cloneable still having the same
/// memory reference.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    streams: Arc<DashMap<Entity, Vec<DomainEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events stored for the entity.
    pub fn event_count(&self, entity: &Entity) -> usize {
        self.streams.get(entity).map(|stream| stream.len()).unwrap_or_default()
    }

    pub fn entities(&self) -> Vec<Entity> {
        self.streams.iter().map(|stream| stream.key().clone()).collect()
    }

    pub fn clear(&self) {
        self.streams.clear();
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    #[tracing::instrument(skip_all, fields(entity = %entity, expected_sequence = expected_sequence), err)]
    async fn save_events(
        &self,
        entity: &Entity,
        events: &[DomainEvent],
        expected_sequence: SequenceNumber,
    ) -> Result<(), EventStoreError> {
        check_sequence(entity, events, expected_sequence)?;

        match self.streams.entry(entity.clone()) {
            Entry::Occupied(mut stream) => {
                let actual = stream.get().len() as SequenceNumber;
                if actual != expected_sequence {
                    return Err(conflict(entity, expected_sequence, actual));
                }
                stream.get_mut().extend_from_slice(events);
            }
            // Streams are only created by their first successful append.
            Entry::Vacant(slot) => {
                if expected_sequence != 0 {
                    return Err(conflict(entity, expected_sequence, 0));
                }
                if !events.is_empty() {
                    slot.insert(events.to_vec());
                }
            }
        }

        tracing::debug!(count = events.len(), "events appended");
        Ok(())
    }

    async fn load_events(
        &self,
        entity: &Entity,
        min_sequence: SequenceNumber,
    ) -> Result<Vec<DomainEvent>, EventStoreError> {
        Ok(self
            .streams
            .get(entity)
            .map(|stream| {
                stream
                    .iter()
                    .filter(|event| event.sequence() >= min_sequence)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

fn conflict(entity: &Entity, expected: SequenceNumber, actual: SequenceNumber) -> EventStoreError {
    tracing::warn!(actual, "stale expected sequence, refusing append");
    EventStoreError::Concurrency {
        entity: entity.clone(),
        expected,
        actual,
    }
}

impl std::fmt::Debug for InMemoryEventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEventStore")
            .field("entities", &self.streams.len())
            .finish()
    }
}
