//! Named entities with ordered fields: the intermediate representation every
//! backend renders from.
mod builder;

pub use builder::{build, ModelBuilder};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::schema::{EnumDef, SchemaNode};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    /// Key exactly as it appears in the source document.
    pub name: String,
    #[serde(rename = "type")]
    pub node: SchemaNode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Seeds test fixtures only.
    #[serde(skip)]
    pub sample: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub name: String,
    pub fields: Vec<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Schema shape this entity was paired with, if any.
    #[serde(skip)]
    pub schema: Option<SchemaNode>,
}

impl Field {
    pub fn new(name: impl Into<String>, node: SchemaNode) -> Self {
        Self { name: name.into(), node, description: None, sample: None }
    }
}

impl Entity {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self { name: name.into(), fields, description: None, schema: None }
    }

    /// Fields whose type names another entity, with that entity's name.
    pub fn references(&self) -> impl Iterator<Item = (&Field, &str)> {
        self.fields
            .iter()
            .filter_map(|f| f.node.referenced_entity().map(|target| (f, target)))
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Entities keyed by qualified name, in discovery order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct EntitySet {
    entities: IndexMap<String, Entity>,
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the name is taken; the first entity under a name wins.
    pub fn insert(&mut self, entity: Entity) -> bool {
        if self.entities.contains_key(&entity.name) {
            return false;
        }
        self.entities.insert(entity.name.clone(), entity);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl FromIterator<Entity> for EntitySet {
    fn from_iter<I: IntoIterator<Item = Entity>>(iter: I) -> Self {
        let mut set = EntitySet::new();
        for entity in iter {
            set.insert(entity);
        }
        set
    }
}

/// Schema and sample data disagreed on a value's type; the sample won.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapeMismatch {
    /// JSON path of the value, e.g. `$.address.zip`.
    pub path: String,
    pub schema: &'static str,
    pub data: &'static str,
}

/// Output of the type model builder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model {
    pub root: String,
    pub entities: EntitySet,
    pub enums: Vec<EnumDef>,
    pub mismatches: Vec<ShapeMismatch>,
}

impl Model {
    pub fn root_entity(&self) -> Option<&Entity> {
        self.entities.get(&self.root)
    }
}
