use serde::{Deserialize, Serialize};

use streamsource::error::{AggregateError, RepositoryError};
use streamsource::Event;

pub enum DummyCommand {
    Create { name: String },
    Increment { by: u64 },
    /// Increments, then emits a payload wrongly tagged as an increment.
    IncrementThenMislabel { by: u64 },
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct DummyCreated {
    pub name: String,
}

impl Event for DummyCreated {
    const DISCRIMINATOR: &'static str = "dummy_created";
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct DummyIncremented {
    pub by: u64,
}

impl Event for DummyIncremented {
    const DISCRIMINATOR: &'static str = "dummy_incremented";
}

/// Claims the discriminator of [`DummyIncremented`] with another shape.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Mislabeled;

impl Event for Mislabeled {
    const DISCRIMINATOR: &'static str = "dummy_incremented";
}

#[derive(thiserror::Error, Debug)]
pub enum DummyError {
    #[error("name must not be empty")]
    EmptyName,
}

#[derive(thiserror::Error, Debug)]
pub enum TestError {
    #[error(transparent)]
    Dummy(#[from] DummyError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
