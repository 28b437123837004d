use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Entity, EntityId, Fields};

/// A schemaless entity: an id plus whatever fields the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: EntityId,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    pub fn new(id: impl Into<EntityId>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Get a payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

impl Entity for Record {
    fn id(&self) -> &EntityId {
        &self.id
    }
}
