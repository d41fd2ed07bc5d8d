use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Identity of an event-sourced stream: the id of the instance together with its type tag.
///
/// On the wire an entity is the string `"<type>:<uuid>"`. The empty entity (nil id, empty type)
/// is a sentinel: an entity missing either part refuses to be serialized.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    id: Uuid,
    entity_type: String,
}

impl Entity {
    pub fn new(id: Uuid, entity_type: impl Into<String>) -> Self {
        Self {
            id,
            entity_type: entity_type.into(),
        }
    }

    /// Creates a brand new entity of the given type, with a random id.
    pub fn of_type(entity_type: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4(), entity_type)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_nil() && self.entity_type.is_empty()
    }

    pub const fn id(&self) -> Uuid {
        self.id
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Name-based UUID scoped to this entity, stable across processes.
    pub fn namespace(&self) -> Uuid {
        Uuid::new_v5(&self.id, self.entity_type.as_bytes())
    }
}

impl Display for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum EntityError {
    #[error("cannot marshal entity with nil id")]
    NilId,
    #[error("cannot marshal entity without type")]
    EmptyType,
    #[error("invalid entity format `{0}`, expected `<type>:<uuid>`")]
    InvalidFormat(String),
    #[error("invalid entity uuid: {0}")]
    InvalidUuid(#[from] uuid::Error),
}

impl FromStr for Entity {
    type Err = EntityError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (entity_type, id) = raw
            .split_once(':')
            .filter(|(entity_type, id)| !entity_type.is_empty() && !id.contains(':'))
            .ok_or_else(|| EntityError::InvalidFormat(raw.to_string()))?;

        let id = Uuid::parse_str(id)?;
        if id.is_nil() {
            return Err(EntityError::NilId);
        }

        Ok(Self::new(id, entity_type))
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.id.is_nil() {
            return Err(S::Error::custom(EntityError::NilId));
        }
        if self.entity_type.is_empty() {
            return Err(S::Error::custom(EntityError::EmptyType));
        }
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Entity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}
