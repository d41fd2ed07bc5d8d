use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use serde_json::Value;

use crate::event::Payload;
use crate::store::EventStoreError;
use crate::Event;

type DecodeFn = fn(Value) -> Result<Arc<dyn Payload>, serde_json::Error>;

#[derive(Clone, Copy)]
struct Decoder {
    decode: DecodeFn,
    type_name: &'static str,
}

/// Maps event discriminators to the concrete types they decode into.
///
/// Built once at startup by the application and handed to the stores that need to read events
/// back from their serialized form.
#[derive(Clone, Default)]
pub struct EventRegistry {
    decoders: HashMap<&'static str, Decoder>,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("discriminator `{discriminator}` already bound to `{registered}`, cannot bind `{conflicting}`")]
    Conflict {
        discriminator: &'static str,
        registered: &'static str,
        conflicting: &'static str,
    },
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `E` as the decode target of its discriminator.
    pub fn register<E: Event>(&mut self) -> Result<&mut Self, RegistryError> {
        match self.decoders.entry(E::DISCRIMINATOR) {
            Entry::Occupied(entry) => Err(RegistryError::Conflict {
                discriminator: E::DISCRIMINATOR,
                registered: entry.get().type_name,
                conflicting: std::any::type_name::<E>(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(Decoder {
                    decode: decode_as::<E>,
                    type_name: std::any::type_name::<E>(),
                });
                Ok(self)
            }
        }
    }

    pub fn contains(&self, discriminator: &str) -> bool {
        self.decoders.contains_key(discriminator)
    }

    /// Decodes a payload into the event type bound to the discriminator.
    ///
    /// # Errors
    ///
    /// Fails with [`EventStoreError::InvalidEventType`] when nothing is bound to the discriminator,
    /// or with [`EventStoreError::Json`] when the payload does not fit the bound type.
    pub fn decode(&self, discriminator: &str, payload: Value) -> Result<Arc<dyn Payload>, EventStoreError> {
        let decoder = self
            .decoders
            .get(discriminator)
            .ok_or_else(|| EventStoreError::InvalidEventType(discriminator.to_string()))?;

        Ok((decoder.decode)(payload)?)
    }
}

fn decode_as<E: Event>(payload: Value) -> Result<Arc<dyn Payload>, serde_json::Error> {
    Ok(Arc::new(serde_json::from_value::<E>(payload)?))
}

impl Debug for EventRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.decoders.iter().map(|(discriminator, decoder)| (discriminator, decoder.type_name)))
            .finish()
    }
}
