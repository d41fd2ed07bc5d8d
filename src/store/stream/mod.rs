use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{future, TryStreamExt};

pub use client::{ConsumeSegment, Entry, Produced, Record, StreamClient};
pub use config::StreamStoreConfig;
pub use envelope::Envelope;

use crate::registry::EventRegistry;
use crate::store::{check_sequence, EventStore, EventStoreError};
use crate::types::SequenceNumber;
use crate::{DomainEvent, Entity};

mod client;
mod config;
mod envelope;

/// [`EventStore`] delegating persistence to an external ordered log.
///
/// The stream of an entity lives in the segment `entity.id` of the space `entity.type`; every
/// event becomes one record whose ordering key is the event sequence. The log is trusted to keep
/// each segment gap-free and to reject appends not continuing its tail.
pub struct StreamStore<C> {
    client: C,
    registry: Arc<EventRegistry>,
    request_timeout: Option<Duration>,
}

impl<C> StreamStore<C>
where
    C: StreamClient,
{
    pub fn new(client: C, config: StreamStoreConfig) -> Self {
        Self {
            client,
            registry: Arc::new(config.registry),
            request_timeout: config.request_timeout,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    async fn within_timeout<T>(
        &self,
        request: impl Future<Output = Result<T, EventStoreError>>,
    ) -> Result<T, EventStoreError> {
        match self.request_timeout {
            Some(duration) => tokio::time::timeout(duration, request)
                .await
                .map_err(|_| EventStoreError::Timeout(duration))?,
            None => request.await,
        }
    }

    fn produce_error(&self, entity: &Entity, expected_sequence: SequenceNumber, error: C::Error) -> EventStoreError {
        match self.client.conflicting_tail(&error) {
            Some(actual) => {
                tracing::warn!(actual, "log rejected append");
                EventStoreError::Concurrency {
                    entity: entity.clone(),
                    expected: expected_sequence,
                    actual,
                }
            }
            None => EventStoreError::Stream(Box::new(error)),
        }
    }

    fn decode(&self, entry: Entry) -> Result<DomainEvent, EventStoreError> {
        let envelope: Envelope = serde_json::from_slice(&entry.payload)?;
        envelope.open(&self.registry)
    }
}

#[async_trait]
impl<C> EventStore for StreamStore<C>
where
    C: StreamClient,
{
    #[tracing::instrument(skip_all, fields(entity = %entity, expected_sequence = expected_sequence), err)]
    async fn save_events(
        &self,
        entity: &Entity,
        events: &[DomainEvent],
        expected_sequence: SequenceNumber,
    ) -> Result<(), EventStoreError> {
        check_sequence(entity, events, expected_sequence)?;

        // Serialize everything upfront: nothing reaches the log if any event fails to encode.
        let records: Vec<Record> = events
            .iter()
            .map(|event| -> Result<Record, EventStoreError> {
                Ok(Record {
                    sequence: event.sequence(),
                    payload: serde_json::to_vec(&Envelope::seal(event)?)?,
                })
            })
            .collect::<Result<_, _>>()?;

        if records.is_empty() {
            return Ok(());
        }

        let segment: String = entity.id().to_string();

        self.within_timeout(async {
            let mut results = self.client.produce(entity.entity_type(), &segment, records);
            while results
                .try_next()
                .await
                .map_err(|error| self.produce_error(entity, expected_sequence, error))?
                .is_some()
            {}
            Ok::<_, EventStoreError>(())
        })
        .await?;

        tracing::debug!(count = events.len(), "events produced to log");
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(entity = %entity, min_sequence = min_sequence), err)]
    async fn load_events(
        &self,
        entity: &Entity,
        min_sequence: SequenceNumber,
    ) -> Result<Vec<DomainEvent>, EventStoreError> {
        let args = ConsumeSegment {
            space: entity.entity_type().to_string(),
            segment: entity.id().to_string(),
            min_sequence,
        };

        self.within_timeout(
            self.client
                .consume_segment(args)
                .map_err(|error| EventStoreError::Stream(Box::new(error)))
                .and_then(|entry| future::ready(self.decode(entry)))
                .try_collect::<Vec<DomainEvent>>(),
        )
        .await
    }
}

impl<C> std::fmt::Debug for StreamStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamStore")
            .field("registry", &self.registry)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
