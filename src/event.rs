use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::SequenceNumber;
use crate::Entity;

/// A concrete domain event shape.
///
/// The discriminator is the stable name of the event: it selects the apply function of an
/// aggregate and the decoder used when reading the event back from a log.
pub trait Event: Serialize + DeserializeOwned + Debug + Send + Sync + 'static {
    const DISCRIMINATOR: &'static str;
}

/// Object safe view over any [`Event`], used to carry heterogeneous events in a single stream.
pub trait Payload: Debug + Send + Sync {
    fn discriminator(&self) -> &'static str;

    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error>;

    fn as_any(&self) -> &dyn Any;

    /// Rust type name of the concrete event, for diagnostics.
    fn type_name(&self) -> &'static str;
}

impl<E> Payload for E
where
    E: Event,
{
    fn discriminator(&self) -> &'static str {
        E::DISCRIMINATOR
    }

    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<E>()
    }
}

/// Metadata stamped on an event when it is raised by an aggregate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// The stream the event belongs to.
    pub entity: Entity,
    /// Uniquely identifies an event among all events emitted from all entities.
    pub event_id: Uuid,
    pub correlation_id: Uuid,
    pub causation_id: Uuid,
    /// The timestamp of when the event was raised.
    pub timestamp: DateTime<Utc>,
    /// The sequence number of the event, within its specific entity.
    pub sequence: SequenceNumber,
}

impl EventMetadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A `DomainEvent` contains the payload (the original event) alongside the event's metadata.
///
/// Cloning is cheap: the payload is shared.
#[derive(Clone, Debug)]
pub struct DomainEvent {
    metadata: EventMetadata,
    payload: Arc<dyn Payload>,
}

impl DomainEvent {
    /// Wraps an event with empty metadata, ready to be raised.
    pub fn new(event: impl Event) -> Self {
        Self {
            metadata: EventMetadata::default(),
            payload: Arc::new(event),
        }
    }

    pub fn from_parts(metadata: EventMetadata, payload: Arc<dyn Payload>) -> Self {
        Self { metadata, payload }
    }

    pub const fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    /// Sets the metadata unless it was already set. Metadata is written at most once.
    pub fn set_metadata(&mut self, metadata: EventMetadata) {
        if self.metadata.is_empty() {
            self.metadata = metadata;
        }
    }

    pub fn discriminator(&self) -> &'static str {
        self.payload.discriminator()
    }

    pub const fn entity(&self) -> &Entity {
        &self.metadata.entity
    }

    pub const fn event_id(&self) -> Uuid {
        self.metadata.event_id
    }

    pub const fn sequence(&self) -> SequenceNumber {
        self.metadata.sequence
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.metadata.timestamp
    }

    /// Returns the original, emitted, event.
    pub fn payload(&self) -> &dyn Payload {
        self.payload.as_ref()
    }

    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.payload.as_any().downcast_ref::<E>()
    }
}
