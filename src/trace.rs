use uuid::Uuid;

use crate::DomainEvent;

/// Correlation and causation identifiers stamped onto every event an aggregate raises.
///
/// Passed explicitly when an aggregate is built; there is no ambient lookup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TraceContext {
    correlation_id: Uuid,
    causation_id: Uuid,
}

impl TraceContext {
    /// Starts a new trace with a fresh correlation id and no cause.
    pub fn new() -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            causation_id: Uuid::nil(),
        }
    }

    pub const fn with_ids(correlation_id: Uuid, causation_id: Uuid) -> Self {
        Self {
            correlation_id,
            causation_id,
        }
    }

    /// Continues the trace carried by an already raised event.
    pub fn from_event(event: &DomainEvent) -> Self {
        let metadata = event.metadata();
        Self::with_ids(metadata.correlation_id, metadata.causation_id)
    }

    pub const fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub const fn causation_id(&self) -> Uuid {
        self.causation_id
    }
}
