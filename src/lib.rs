pub use crate::aggregate::Aggregate;
pub use crate::entity::Entity;
pub use crate::event::{DomainEvent, Event, EventMetadata, Payload};
pub use crate::repository::Repository;
pub use crate::state::AggregateState;
pub use crate::trace::TraceContext;

mod aggregate;
mod entity;
mod event;
mod repository;
mod state;
mod trace;

pub mod handler;
pub mod registry;
pub mod store;

pub mod error {
    pub use serde_json::Error as JsonError;

    pub use crate::aggregate::AggregateError;
    pub use crate::entity::EntityError;
    pub use crate::registry::RegistryError;
    pub use crate::repository::RepositoryError;
    pub use crate::store::EventStoreError;
}

pub mod types {
    /// Position of an event within the stream of a single entity. Sequences start from 1.
    pub type SequenceNumber = u64;
}
