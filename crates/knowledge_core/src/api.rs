use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Entity, EntitySummary, Id, KnowledgeResult, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
}

/// Row counts touched by one save.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveReport {
    pub inserted: u64,
    pub updated: u64,
    pub deleted: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FactFilter {
    pub key: String,
    pub op: CompareOp,
    pub value: Value,
}

impl FactFilter {
    pub fn equal(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            op: CompareOp::Eq,
            value: value.into(),
        }
    }

    pub fn not_equal(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            op: CompareOp::Ne,
            value: value.into(),
        }
    }
}

#[async_trait]
pub trait EntityStoreApi {
    /// Writes the entity and reconciles its stored facts with the in-memory map.
    async fn save_entity(&self, entity: &Entity) -> KnowledgeResult<SaveReport>;
    async fn load_entity(&self, entity_id: Id) -> KnowledgeResult<Option<Entity>>;
    async fn find_entity_by_name(&self, name: &str) -> KnowledgeResult<Option<Entity>>;
    async fn delete_entity(&self, entity_id: Id) -> KnowledgeResult<bool>;
    async fn list_entities(&self) -> KnowledgeResult<Vec<EntitySummary>>;
    async fn find_entities_by_fact(&self, filter: FactFilter) -> KnowledgeResult<Vec<Id>>;
}
