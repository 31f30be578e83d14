use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    Id, KnowledgeResult, PolymorphicVerticalProperty, TypeMap, TypeMapping, Value, ValueColumn,
    ValueType, VerticalPropertyDict, VerticalPropertyMap,
};

pub const DISCRIMINATOR_STR: &str = "varchar";
pub const DISCRIMINATOR_INT: &str = "integer";
pub const DISCRIMINATOR_FLOAT: &str = "float";
pub const DISCRIMINATOR_BOOL: &str = "boolean";

/// Type map of [`Fact`] rows.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FactTypes;

impl TypeMap for FactTypes {
    const NAME: &'static str = "Fact";
    const ENTRIES: &'static [TypeMapping] = &[
        TypeMapping::new(ValueType::Null, None, None),
        TypeMapping::new(
            ValueType::Str,
            Some(DISCRIMINATOR_STR),
            Some(ValueColumn::Char),
        ),
        TypeMapping::new(
            ValueType::Int,
            Some(DISCRIMINATOR_INT),
            Some(ValueColumn::Int),
        ),
        TypeMapping::new(
            ValueType::Float,
            Some(DISCRIMINATOR_FLOAT),
            Some(ValueColumn::Float),
        ),
        TypeMapping::new(
            ValueType::Bool,
            Some(DISCRIMINATOR_BOOL),
            Some(ValueColumn::Bool),
        ),
    ];
}

/// One property row of an [`Entity`].
pub type Fact = PolymorphicVerticalProperty<FactTypes>;

/// A named thing carrying free-form facts.
///
/// Fact row ids are unique across all entities, so a cloned entity must not
/// be saved under another id. Use [`Entity::duplicate`] to copy one.
#[derive(Clone, Debug)]
pub struct Entity {
    pub id: Id,
    pub name: String,
    pub facts: VerticalPropertyMap<Fact>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Id::new(),
            name: name.into(),
            facts: VerticalPropertyMap::new(),
        }
    }

    pub fn from_parts(id: Id, name: impl Into<String>, facts: Vec<Fact>) -> KnowledgeResult<Self> {
        Ok(Self {
            id,
            name: name.into(),
            facts: VerticalPropertyMap::from_rows(facts)?,
        })
    }

    /// A copy under a fresh entity id whose facts also get fresh row ids.
    pub fn duplicate(&self, name: impl Into<String>) -> KnowledgeResult<Self> {
        Self::from_parts(Id::new(), name, self.facts.rows().map(Fact::renewed).collect())
    }

    pub fn summary(&self) -> EntitySummary {
        EntitySummary {
            id: self.id,
            name: self.name.clone(),
            fact_count: self.facts.len() as u64,
        }
    }
}

impl VerticalPropertyDict for Entity {
    type Row = Fact;

    fn property_map(&self) -> &VerticalPropertyMap<Fact> {
        &self.facts
    }

    fn property_map_mut(&mut self) -> &mut VerticalPropertyMap<Fact> {
        &mut self.facts
    }

    fn declared_field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::Str(self.id.to_uuid_string())),
            "name" => Some(Value::Str(self.name.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Entity '{}'>", self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub id: Id,
    pub name: String,
    pub fact_count: u64,
}
