//! Normalized shape descriptors and schema acquisition.
//!
//! A [`Schema`] is obtained either from an explicit JSON Schema document
//! ([`document`]) or by inference over the sample document ([`infer`]).
//! Either way the result is the same closed [`SchemaNode`] vocabulary, and
//! the type model builder only ever consults it for metadata and for
//! agreement checks against the sample data.
pub mod document;
pub mod infer;

use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::error::AcquisitionError;

// ------------------------------- Shapes ---------------------------------- //

/// Shape of one JSON value. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum SchemaNode {
    Null,
    Bool,
    Integer,
    Float,
    String,
    /// Unknown element type, e.g. the items of an empty array.
    Any,
    Array(Box<SchemaNode>),
    Object(Properties),
    Enum(EnumDef),
    /// Reference to an entity by qualified name.
    Ref(String),
}

pub type Properties = IndexMap<String, Property>;

/// One entry of an object shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub node: SchemaNode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumDef {
    pub name: String,
    /// Distinct, in declaration order.
    pub values: Vec<String>,
}

impl SchemaNode {
    pub fn array_of(item: SchemaNode) -> Self {
        SchemaNode::Array(Box::new(item))
    }

    /// Entity named by this node, looking through arrays.
    pub fn referenced_entity(&self) -> Option<&str> {
        match self {
            SchemaNode::Ref(name) => Some(name),
            SchemaNode::Array(item) => item.referenced_entity(),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            SchemaNode::Null => "null",
            SchemaNode::Bool => "boolean",
            SchemaNode::Integer => "integer",
            SchemaNode::Float => "number",
            SchemaNode::String => "string",
            SchemaNode::Any => "any",
            SchemaNode::Array(_) => "array",
            SchemaNode::Object(_) => "object",
            SchemaNode::Enum(_) => "enum",
            SchemaNode::Ref(_) => "reference",
        }
    }
}

impl Property {
    pub fn new(node: SchemaNode) -> Self {
        Self { node, description: None }
    }
}

impl EnumDef {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = Vec::<String>::new();
        for v in values {
            let v = v.into();
            if !out.contains(&v) {
                out.push(v);
            }
        }
        Self { name: name.into(), values: out }
    }
}

/// JSON type name of a sample value, for diagnostics.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ------------------------------- Schema ---------------------------------- //

/// Everything the builder may consult besides the sample data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    /// Shape of the root document, when known.
    pub root: Option<SchemaNode>,
    pub root_description: Option<String>,
    /// Enum definitions, once per distinct name, in declaration order.
    pub enums: Vec<EnumDef>,
    /// Named object shapes reachable through `$ref`.
    pub definitions: IndexMap<String, Property>,
}

impl Schema {
    /// Schema inferred from the sample document itself.
    pub fn inferred(data: &Value) -> Self {
        Self {
            root: Some(infer::observe(data)),
            ..Self::default()
        }
    }

    pub fn definition(&self, name: &str) -> Option<&Property> {
        self.definitions.get(name)
    }

    /// Follow a `Ref` to its named definition; other nodes pass through.
    pub fn resolve<'a>(&'a self, node: &'a SchemaNode) -> &'a SchemaNode {
        match node {
            SchemaNode::Ref(name) => self
                .definitions
                .get(name)
                .map(|p| &p.node)
                .unwrap_or(node),
            _ => node,
        }
    }
}

// ----------------------------- Acquisition ------------------------------- //

/// Read and parse a JSON document.
pub fn read_document(path: &Path) -> Result<Value, AcquisitionError> {
    let source = read_source(path)?;
    crate::path_de::from_str_with_path::<Value>(&source).map_err(|detail| {
        AcquisitionError::Parse { path: path.to_path_buf(), detail }
    })
}

/// Read and normalize a JSON Schema document.
pub fn read_schema(path: &Path) -> Result<Schema, AcquisitionError> {
    let source = read_source(path)?;
    let doc = crate::path_de::from_str_with_path::<document::SchemaDocument>(&source)
        .map_err(|detail| AcquisitionError::Parse { path: path.to_path_buf(), detail })?;
    Ok(doc.into_schema())
}

/// Select a sub-document by JSON pointer (`""` selects the whole document).
pub fn select(data: Value, pointer: &str) -> Result<Value, AcquisitionError> {
    if pointer.is_empty() {
        return Ok(data);
    }
    data.pointer(pointer)
        .cloned()
        .ok_or_else(|| AcquisitionError::Pointer { pointer: pointer.to_string() })
}

fn read_source(path: &Path) -> Result<String, AcquisitionError> {
    std::fs::read_to_string(path).map_err(|source| AcquisitionError::Read {
        path: path.to_path_buf(),
        source,
    })
}
