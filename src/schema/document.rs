//! The subset of JSON Schema the generator understands.
//!
//! Unknown keywords are ignored. `definitions` (or `$defs`) entries carrying
//! an `enum` become [`EnumDef`]s; all other definitions are named shapes that
//! properties can point at with `$ref`.
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use super::{EnumDef, Properties, Property, Schema, SchemaNode};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SchemaDocument {
    #[serde(rename = "type")]
    pub type_: Option<TypeDecl>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub properties: IndexMap<String, SchemaDocument>,
    pub items: Option<Items>,
    #[serde(rename = "enum")]
    pub enum_: Option<Vec<Value>>,
    #[serde(alias = "$defs")]
    pub definitions: IndexMap<String, SchemaDocument>,
    #[serde(rename = "$ref")]
    pub ref_: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TypeDecl {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Items {
    One(Box<SchemaDocument>),
    /// Positional form; only the first position is used.
    Tuple(Vec<SchemaDocument>),
}

impl TypeDecl {
    /// Primary type name; `["string", "null"]` reads as `string`.
    fn primary(&self) -> Option<&str> {
        match self {
            TypeDecl::One(t) => Some(t),
            TypeDecl::Many(ts) => ts
                .iter()
                .find(|t| t.as_str() != "null")
                .or_else(|| ts.first())
                .map(String::as_str),
        }
    }
}

impl SchemaDocument {
    pub fn into_schema(self) -> Schema {
        let mut enums = Vec::<EnumDef>::new();
        let mut shapes = IndexMap::<String, &SchemaDocument>::new();
        for (name, def) in &self.definitions {
            match &def.enum_ {
                Some(values) if enums.iter().all(|e| &e.name != name) => {
                    enums.push(EnumDef::new(name.clone(), values.iter().map(enum_literal)));
                }
                Some(_) => {}
                None => {
                    shapes.insert(name.clone(), def);
                }
            }
        }

        let lower = Lowering { enums: &enums };
        let definitions = shapes
            .into_iter()
            .map(|(name, def)| (name, lower.property(def)))
            .collect();
        let root = lower.node(&self);

        Schema {
            root: Some(root),
            root_description: self.description.clone().or_else(|| self.title.clone()),
            enums,
            definitions,
        }
    }
}

fn enum_literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Last path segment of a local reference: `#/definitions/Node` → `Node`.
pub fn ref_name(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

struct Lowering<'a> {
    enums: &'a [EnumDef],
}

impl Lowering<'_> {
    fn property(&self, doc: &SchemaDocument) -> Property {
        Property {
            node: self.node(doc),
            description: doc.description.clone(),
        }
    }

    fn node(&self, doc: &SchemaDocument) -> SchemaNode {
        if let Some(reference) = &doc.ref_ {
            let name = ref_name(reference);
            return match self.enums.iter().find(|e| e.name == name) {
                Some(def) => SchemaNode::Enum(def.clone()),
                None => SchemaNode::Ref(name.to_string()),
            };
        }
        match doc.type_.as_ref().and_then(TypeDecl::primary) {
            Some("null") => SchemaNode::Null,
            Some("boolean") => SchemaNode::Bool,
            Some("integer") => SchemaNode::Integer,
            Some("number") => SchemaNode::Float,
            Some("string") => SchemaNode::String,
            Some("array") => self.array(doc),
            Some("object") => SchemaNode::Object(self.properties(doc)),
            Some(_) => SchemaNode::Any,
            None if !doc.properties.is_empty() => SchemaNode::Object(self.properties(doc)),
            None if doc.items.is_some() => self.array(doc),
            None => SchemaNode::Any,
        }
    }

    fn array(&self, doc: &SchemaDocument) -> SchemaNode {
        let item = match &doc.items {
            Some(Items::One(item)) => self.node(item),
            Some(Items::Tuple(items)) => items.first().map(|i| self.node(i)).unwrap_or(SchemaNode::Any),
            None => SchemaNode::Any,
        };
        SchemaNode::array_of(item)
    }

    fn properties(&self, doc: &SchemaDocument) -> Properties {
        doc.properties
            .iter()
            .map(|(k, v)| (k.clone(), self.property(v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: Value) -> Schema {
        serde_json::from_value::<SchemaDocument>(v).unwrap().into_schema()
    }

    #[test]
    fn enum_definitions_are_collected_in_order() {
        let schema = parse(json!({
            "definitions": {
                "Status": { "enum": ["active", "inactive"] },
                "Level": { "enum": [1, 2, 3] },
                "Node": { "type": "object", "properties": { "id": { "type": "integer" } } }
            }
        }));
        let names: Vec<_> = schema.enums.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Status", "Level"]);
        assert_eq!(schema.enums[1].values, ["1", "2", "3"]);
        assert!(schema.definition("Node").is_some());
        assert!(schema.definition("Status").is_none());
    }

    #[test]
    fn properties_keep_descriptions_and_refs() {
        let schema = parse(json!({
            "type": "object",
            "description": "A person",
            "properties": {
                "name": { "type": "string", "description": "Full name" },
                "status": { "$ref": "#/definitions/Status" },
                "parent": { "$ref": "#/$defs/Person" },
                "tags": { "type": "array", "items": { "type": "string" } },
                "nick": { "type": ["null", "string"] }
            },
            "$defs": {
                "Status": { "enum": ["a", "b"] },
                "Person": { "type": "object" }
            }
        }));
        assert_eq!(schema.root_description.as_deref(), Some("A person"));
        let Some(SchemaNode::Object(props)) = &schema.root else { panic!("root is not an object") };
        assert_eq!(props["name"].description.as_deref(), Some("Full name"));
        assert!(matches!(&props["status"].node, SchemaNode::Enum(def) if def.name == "Status"));
        assert_eq!(props["parent"].node, SchemaNode::Ref("Person".into()));
        assert_eq!(props["tags"].node, SchemaNode::array_of(SchemaNode::String));
        assert_eq!(props["nick"].node, SchemaNode::String);
    }

    #[test]
    fn untyped_shapes_are_read_from_keywords() {
        let schema = parse(json!({ "properties": { "xs": { "items": { "type": "number" } }, "y": {} } }));
        let Some(SchemaNode::Object(props)) = &schema.root else { panic!("root is not an object") };
        assert_eq!(props["xs"].node, SchemaNode::array_of(SchemaNode::Float));
        assert_eq!(props["y"].node, SchemaNode::Any);
    }
}
