use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};

use crate::aggregate::AggregateError;
use crate::{Aggregate, DomainEvent, Event};

type ApplyFn<A> = Box<dyn Fn(&mut A, &DomainEvent) -> Result<(), AggregateError> + Send + Sync>;
type CheckFn = fn(&DomainEvent) -> Result<(), AggregateError>;

/// What happens when an event has no registered handler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Dispatch {
    /// Unhandled events are applied as no-ops.
    #[default]
    Permissive,
    /// Unhandled events fail with [`AggregateError::EventHandlerNotFound`].
    Strict,
}

struct Handler<A> {
    apply: ApplyFn<A>,
    /// Tells whether `apply` accepts the payload of the event, without touching any state.
    check: CheckFn,
}

/// Collects the apply functions of an aggregate, keyed by event discriminator.
pub struct HandlerRegistry<A> {
    handlers: HashMap<String, Handler<A>>,
    dispatch: Dispatch,
}

impl<A> HandlerRegistry<A>
where
    A: 'static,
{
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            dispatch: Dispatch::default(),
        }
    }

    /// Makes events without a handler an error instead of a no-op.
    pub fn strict(&mut self) -> &mut Self {
        self.dispatch = Dispatch::Strict;
        self
    }

    /// Binds a handler receiving the type-erased event.
    pub fn register<F>(&mut self, discriminator: impl Into<String>, handler: F) -> Result<&mut Self, AggregateError>
    where
        F: Fn(&mut A, &DomainEvent) + Send + Sync + 'static,
    {
        self.insert(
            discriminator.into(),
            Handler {
                apply: Box::new(move |state, event| {
                    handler(state, event);
                    Ok(())
                }),
                check: |_| Ok(()),
            },
        )
    }

    /// Binds a handler for a concrete event type, under its discriminator.
    ///
    /// At dispatch the payload is checked against `E`: a payload of another type carrying the
    /// same discriminator fails with [`AggregateError::HandlerTypeMismatch`].
    pub fn on<E, F>(&mut self, handler: F) -> Result<&mut Self, AggregateError>
    where
        E: Event,
        F: Fn(&mut A, &E) + Send + Sync + 'static,
    {
        self.insert(
            E::DISCRIMINATOR.to_string(),
            Handler {
                apply: Box::new(move |state, event| {
                    handler(state, downcast::<E>(event)?);
                    Ok(())
                }),
                check: |event| downcast::<E>(event).map(|_| ()),
            },
        )
    }

    fn insert(&mut self, discriminator: String, handler: Handler<A>) -> Result<&mut Self, AggregateError> {
        match self.handlers.entry(discriminator) {
            Entry::Occupied(entry) => Err(AggregateError::DuplicateHandler(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(handler);
                Ok(self)
            }
        }
    }

    pub fn build(self) -> Handlers<A> {
        Handlers {
            handlers: self.handlers,
            dispatch: self.dispatch,
        }
    }
}

impl<A> Default for HandlerRegistry<A>
where
    A: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

fn downcast<E: Event>(event: &DomainEvent) -> Result<&E, AggregateError> {
    event
        .downcast_ref::<E>()
        .ok_or_else(|| AggregateError::HandlerTypeMismatch {
            discriminator: E::DISCRIMINATOR.to_string(),
            expected: std::any::type_name::<E>(),
            found: event.payload().type_name(),
        })
}

/// The frozen set of apply functions of an aggregate type.
pub struct Handlers<A> {
    handlers: HashMap<String, Handler<A>>,
    dispatch: Dispatch,
}

impl<A> Handlers<A>
where
    A: Aggregate,
{
    /// Builds the handlers declared by [`Aggregate::register_handlers`].
    pub fn for_aggregate() -> Result<Self, AggregateError> {
        let mut registry = HandlerRegistry::new();
        A::register_handlers(&mut registry)?;
        Ok(registry.build())
    }
}

impl<A> Handlers<A> {
    /// Applies the event onto the state through the handler bound to its discriminator.
    pub fn apply(&self, state: &mut A, event: &DomainEvent) -> Result<(), AggregateError> {
        match self.handler(event)? {
            Some(handler) => (handler.apply)(state, event),
            None => Ok(()),
        }
    }

    /// Fails exactly when [`Handlers::apply`] would reject the event, leaving the state alone.
    pub fn check(&self, event: &DomainEvent) -> Result<(), AggregateError> {
        match self.handler(event)? {
            Some(handler) => (handler.check)(event),
            None => Ok(()),
        }
    }

    fn handler(&self, event: &DomainEvent) -> Result<Option<&Handler<A>>, AggregateError> {
        match self.handlers.get(event.discriminator()) {
            None if self.dispatch == Dispatch::Strict => {
                Err(AggregateError::EventHandlerNotFound(event.discriminator().to_string()))
            }
            handler => Ok(handler),
        }
    }
}

impl<A> Debug for Handlers<A> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handlers")
            .field("discriminators", &self.handlers.keys().collect::<Vec<_>>())
            .field("dispatch", &self.dispatch)
            .finish()
    }
}
