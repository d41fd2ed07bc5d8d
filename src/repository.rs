use uuid::Uuid;

use crate::aggregate::AggregateError;
use crate::store::{EventStore, EventStoreError};
use crate::{Aggregate, AggregateState, TraceContext};

/// The Repository is responsible for coupling aggregates with an [`EventStore`], so that the
/// events they raise can be persisted, and their state can be reconstructed by replaying
/// persisted events sequentially.
///
/// The basic APIs are:
/// 1. load
/// 2. save
/// 3. handle_command
pub struct Repository<S>
where
    S: EventStore,
{
    event_store: S,
}

#[derive(thiserror::Error, Debug)]
pub enum RepositoryError {
    #[error(transparent)]
    Store(#[from] EventStoreError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl RepositoryError {
    /// Whether the aggregate is stale and should be reloaded before retrying.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(error) if error.is_conflict())
    }
}

impl<S> Repository<S>
where
    S: EventStore,
{
    /// Creates a new instance of a [`Repository`].
    pub fn new(event_store: S) -> Self {
        Self { event_store }
    }

    /// Replays every persisted event of the aggregate entity onto its state.
    ///
    /// An entity without events leaves the state untouched.
    #[tracing::instrument(skip_all, fields(entity = %aggregate_state.entity()), err)]
    pub async fn load<A>(&self, aggregate_state: &mut AggregateState<A>) -> Result<(), RepositoryError>
    where
        A: Aggregate,
    {
        let events = self.event_store.load_events(aggregate_state.entity(), 0).await?;
        aggregate_state.load(events)?;

        tracing::debug!(
            committed_sequence = aggregate_state.committed_sequence(),
            "aggregate loaded"
        );
        Ok(())
    }

    /// Builds the state of the entity `<A::NAME>:<id>` and loads it from the event store.
    pub async fn open<A>(
        &self,
        aggregate_id: impl Into<Uuid> + Send,
        trace: TraceContext,
    ) -> Result<AggregateState<A>, RepositoryError>
    where
        A: Aggregate,
    {
        let mut aggregate_state = AggregateState::with_id(aggregate_id, trace)?;
        self.load(&mut aggregate_state).await?;
        Ok(aggregate_state)
    }

    /// Persists the uncommitted events of the aggregate, expecting the stream to still end at
    /// its committed sequence, then commits them.
    ///
    /// On failure the uncommitted events are left in place: reload and retry, or discard the
    /// state.
    #[tracing::instrument(skip_all, fields(entity = %aggregate_state.entity()), err)]
    pub async fn save<A>(&self, aggregate_state: &mut AggregateState<A>) -> Result<(), RepositoryError>
    where
        A: Aggregate,
    {
        if aggregate_state.uncommitted_events().is_empty() {
            return Ok(());
        }

        self.event_store
            .save_events(
                aggregate_state.entity(),
                aggregate_state.uncommitted_events(),
                aggregate_state.committed_sequence(),
            )
            .await?;

        aggregate_state.commit();

        tracing::debug!(
            committed_sequence = aggregate_state.committed_sequence(),
            "aggregate committed"
        );
        Ok(())
    }

    /// Validates and handles the command onto the given state, and then passes the raised events
    /// to the store.
    pub async fn handle_command<A, Er>(
        &self,
        aggregate_state: &mut AggregateState<A>,
        command: A::Command,
    ) -> Result<(), Er>
    where
        A: Aggregate,
        Er: From<A::Error> + From<RepositoryError>,
    {
        let events = aggregate_state.inner().handle_command(command)?;
        aggregate_state.raise_events(events).map_err(RepositoryError::from)?;

        self.save(aggregate_state).await?;
        Ok(())
    }

    /// Returns the internal event store
    pub fn event_store(&self) -> &S {
        &self.event_store
    }
}

impl<S> std::fmt::Debug for Repository<S>
where
    S: EventStore + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("event_store", &self.event_store)
            .finish()
    }
}
