use std::fmt::{Debug, Formatter};

use chrono::Utc;
use uuid::Uuid;

use crate::aggregate::AggregateError;
use crate::handler::Handlers;
use crate::types::SequenceNumber;
use crate::{Aggregate, DomainEvent, Entity, Event, EventMetadata, TraceContext};

/// The in-memory, event-sourced state of one entity.
///
/// Tracks the events already persisted (committed) apart from the ones raised since the last
/// successful save (uncommitted). The state is owned by a single caller: every mutation goes
/// through `&mut self`.
pub struct AggregateState<A>
where
    A: Aggregate,
{
    entity: Entity,
    trace: TraceContext,
    committed: Vec<DomainEvent>,
    committed_sequence: SequenceNumber,
    uncommitted: Vec<DomainEvent>,
    uncommitted_sequence: SequenceNumber,
    handlers: Handlers<A>,
    inner: A,
}

impl<A> AggregateState<A>
where
    A: Aggregate,
{
    /// Creates an empty state for the given entity, building the aggregate handlers.
    ///
    /// # Errors
    ///
    /// Fails if [`Aggregate::register_handlers`] is miswired.
    pub fn new(entity: Entity, trace: TraceContext) -> Result<Self, AggregateError> {
        Ok(Self {
            entity,
            trace,
            committed: vec![],
            committed_sequence: 0,
            uncommitted: vec![],
            uncommitted_sequence: 0,
            handlers: Handlers::for_aggregate()?,
            inner: A::default(),
        })
    }

    /// Creates an empty state for the entity `<A::NAME>:<id>`.
    pub fn with_id(id: impl Into<Uuid>, trace: TraceContext) -> Result<Self, AggregateError> {
        Self::new(Entity::new(id.into(), A::NAME), trace)
    }

    pub const fn entity(&self) -> &Entity {
        &self.entity
    }

    pub const fn trace(&self) -> &TraceContext {
        &self.trace
    }

    pub const fn inner(&self) -> &A {
        &self.inner
    }

    pub fn committed_events(&self) -> &[DomainEvent] {
        &self.committed
    }

    /// Sequence of the last event known to be persisted. Used as the expected version on save.
    pub const fn committed_sequence(&self) -> SequenceNumber {
        self.committed_sequence
    }

    pub fn uncommitted_events(&self) -> &[DomainEvent] {
        &self.uncommitted
    }

    pub const fn uncommitted_sequence(&self) -> SequenceNumber {
        self.uncommitted_sequence
    }

    /// Raises a new event: stamps its metadata, applies it onto the state and queues it as
    /// uncommitted.
    pub fn raise(&mut self, event: impl Event) -> Result<(), AggregateError> {
        self.raise_event(DomainEvent::new(event))
    }

    /// Same as [`AggregateState::raise`] for an already wrapped event. Metadata already present
    /// on the event is kept as is.
    ///
    /// # Errors
    ///
    /// If the handler rejects the event the state is left untouched.
    pub fn raise_event(&mut self, mut event: DomainEvent) -> Result<(), AggregateError> {
        event.set_metadata(EventMetadata {
            entity: self.entity.clone(),
            event_id: Uuid::new_v4(),
            correlation_id: self.trace.correlation_id(),
            causation_id: self.trace.causation_id(),
            timestamp: Utc::now(),
            sequence: self.uncommitted_sequence + 1,
        });

        self.handlers.apply(&mut self.inner, &event)?;

        self.uncommitted_sequence = event.sequence();
        self.uncommitted.push(event);
        Ok(())
    }

    /// Replays already persisted events, in order, onto the state.
    ///
    /// Events raised afterwards continue the sequence of the last replayed event. The
    /// uncommitted events are left untouched.
    ///
    /// # Errors
    ///
    /// Stops at the first event a handler rejects: the state should then be discarded.
    pub fn load(&mut self, events: impl IntoIterator<Item = DomainEvent>) -> Result<(), AggregateError> {
        for event in events {
            self.handlers.apply(&mut self.inner, &event)?;
            self.committed_sequence = event.sequence();
            self.committed.push(event);
        }

        self.uncommitted_sequence = self.uncommitted_sequence.max(self.committed_sequence);
        Ok(())
    }

    /// Moves every uncommitted event to the committed ones.
    ///
    /// Must only be called once the uncommitted events are durably persisted.
    pub fn commit(&mut self) {
        self.committed.append(&mut self.uncommitted);
        self.committed_sequence = self.uncommitted_sequence;
    }

    /// Raises the events in order, as a whole.
    ///
    /// # Errors
    ///
    /// Every event is checked against its handler before the first one is applied: if any is
    /// rejected none is raised and the state is left untouched.
    pub fn raise_events(&mut self, events: impl IntoIterator<Item = DomainEvent>) -> Result<(), AggregateError> {
        let events: Vec<DomainEvent> = events.into_iter().collect();
        for event in &events {
            self.handlers.check(event)?;
        }

        for event in events {
            self.raise_event(event)?;
        }
        Ok(())
    }

    /// Validates and handles the command onto the current state, raising the resulting events.
    pub fn handle_command<Er>(&mut self, command: A::Command) -> Result<(), Er>
    where
        Er: From<A::Error> + From<AggregateError>,
    {
        let events = self.inner.handle_command(command)?;
        self.raise_events(events)?;
        Ok(())
    }
}

impl<A> Debug for AggregateState<A>
where
    A: Aggregate + Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateState")
            .field("entity", &self.entity)
            .field("committed_sequence", &self.committed_sequence)
            .field("uncommitted_sequence", &self.uncommitted_sequence)
            .field("inner", &self.inner)
            .finish()
    }
}
