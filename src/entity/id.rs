//! EntityId - identity of an entity, server-assigned or client-local.

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// JSON key used to encode a client-local id.
pub const LOCAL_ID_KEY: &str = "$local";

/// Identity of an entity within a collection.
///
/// Servers assign `Int` or `Str` ids (JSON numbers or strings). `Local` ids
/// are synthesized by the store for optimistic creates and are encoded as
/// `{"$local": n}`. A JSON number or string never deserializes to `Local`,
/// so a local id cannot collide with any server id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityId {
    Int(i64),
    Str(String),
    Local(u64),
}

impl EntityId {
    /// True for ids synthesized by the store that the server has not confirmed.
    pub fn is_local(&self) -> bool {
        matches!(self, EntityId::Local(_))
    }

    /// Parse a URL path segment. Integers become `Int`, anything else `Str`.
    pub fn from_path_segment(segment: &str) -> Self {
        match segment.parse::<i64>() {
            Ok(n) => EntityId::Int(n),
            Err(_) => EntityId::Str(segment.to_string()),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(n) => write!(f, "{}", n),
            EntityId::Str(s) => write!(f, "{}", s),
            EntityId::Local(n) => write!(f, "local-{}", n),
        }
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        EntityId::Int(value)
    }
}

impl From<i32> for EntityId {
    fn from(value: i32) -> Self {
        EntityId::Int(value as i64)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        EntityId::Str(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        EntityId::Str(value)
    }
}

impl From<&EntityId> for EntityId {
    fn from(value: &EntityId) -> Self {
        value.clone()
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EntityId::Int(n) => serializer.serialize_i64(*n),
            EntityId::Str(s) => serializer.serialize_str(s),
            EntityId::Local(n) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(LOCAL_ID_KEY, n)?;
                map.end()
            }
        }
    }
}

struct EntityIdVisitor;

impl<'de> Visitor<'de> for EntityIdVisitor {
    type Value = EntityId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer, a string, or a {\"$local\": n} object")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<EntityId, E> {
        Ok(EntityId::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<EntityId, E> {
        i64::try_from(v)
            .map(EntityId::Int)
            .map_err(|_| E::custom(format!("id {} out of range", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<EntityId, E> {
        Ok(EntityId::Str(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<EntityId, E> {
        Ok(EntityId::Str(v))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<EntityId, A::Error> {
        let mut local = None;
        while let Some(key) = map.next_key::<String>()? {
            if key == LOCAL_ID_KEY {
                local = Some(map.next_value::<u64>()?);
            } else {
                return Err(de::Error::unknown_field(&key, &[LOCAL_ID_KEY]));
            }
        }
        local
            .map(EntityId::Local)
            .ok_or_else(|| de::Error::missing_field(LOCAL_ID_KEY))
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(EntityIdVisitor)
    }
}
