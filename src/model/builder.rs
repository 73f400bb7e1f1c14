//! Type model builder: walks the sample document paired with its schema.
//!
//! The sample data decides every field's type. The schema contributes
//! descriptions, enum typing for string values it lists, and definition
//! names for `$ref`'d objects. Where the two disagree the disagreement is
//! recorded as a [`ShapeMismatch`] and the sample wins.
use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, debug_span, warn};

use super::{Entity, EntitySet, Field, Model, ShapeMismatch};
use crate::error::{Error, Result};
use crate::graph::DependencyGraph;
use crate::naming;
use crate::schema::{infer, json_kind, Property, Schema, SchemaNode};

/// Build the entity set for `data` and register its dependency edges in
/// `graph`.
pub fn build(
    data: &Value,
    schema: &Schema,
    root_name: &str,
    graph: &mut DependencyGraph,
) -> Result<Model> {
    ModelBuilder::new(schema).build(data, root_name, graph)
}

pub struct ModelBuilder<'s> {
    schema: &'s Schema,
    /// Reserved on discovery, filled on completion; keeps discovery order.
    slots: IndexMap<String, Option<Entity>>,
    /// Type identifier → the source location that claimed it. Keyed by the
    /// identifier so that no two entities (or an entity and an enum) spell
    /// the same type in a backend.
    origins: HashMap<String, String>,
    mismatches: Vec<ShapeMismatch>,
}

enum Claim {
    Fresh(String),
    Existing(String),
}

impl<'s> ModelBuilder<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        let origins = schema
            .enums
            .iter()
            .map(|def| (naming::type_ident(&def.name), format!("#/enums/{}", def.name)))
            .collect();
        Self {
            schema,
            slots: IndexMap::new(),
            origins,
            mismatches: Vec::new(),
        }
    }

    pub fn build(
        mut self,
        data: &Value,
        root_name: &str,
        graph: &mut DependencyGraph,
    ) -> Result<Model> {
        let _span = debug_span!("build", root = root_name).entered();
        let schema = self.schema;

        let object = root_object(data)?;
        let root_shape = schema.root.as_ref().map(|node| match (data, schema.resolve(node)) {
            (Value::Array(_), SchemaNode::Array(item)) => schema.resolve(item),
            (_, node) => node,
        });
        let root = self.entity(
            root_name,
            "$",
            "$",
            object,
            root_shape,
            schema.root_description.clone(),
        );

        let entities: EntitySet = self.slots.into_values().flatten().collect();
        graph.extend_from(&entities);
        if !self.mismatches.is_empty() {
            debug!(count = self.mismatches.len(), "schema/sample shape mismatches resolved in favour of the sample");
        }
        debug!(entities = entities.len(), "built type model");

        Ok(Model {
            root,
            entities,
            enums: schema.enums.clone(),
            mismatches: self.mismatches,
        })
    }

    /// Register (or reuse) the entity for one object value; returns its name.
    fn entity(
        &mut self,
        wanted: &str,
        origin: &str,
        path: &str,
        object: &Map<String, Value>,
        shape: Option<&'s SchemaNode>,
        description: Option<String>,
    ) -> String {
        let name = match self.claim(wanted, origin) {
            Claim::Existing(name) => return name,
            Claim::Fresh(name) => name,
        };
        self.slots.insert(name.clone(), None);

        let properties = shape.and_then(|node| match node {
            SchemaNode::Object(props) => Some(props),
            _ => None,
        });

        let mut fields = Vec::with_capacity(object.len());
        for (key, value) in object {
            let property = properties.and_then(|props| props.get(key));
            let field_path = format!("{path}.{key}");
            let node = self.field_node(&name, key, value, property.map(|p| &p.node), &field_path);
            fields.push(Field {
                name: key.clone(),
                node,
                description: property.and_then(|p| self.field_description(p)),
                sample: Some(value.clone()),
            });
        }

        let entity = Entity {
            name: name.clone(),
            fields,
            description,
            schema: shape.cloned(),
        };
        self.slots.insert(name.clone(), Some(entity));
        name
    }

    fn field_node(
        &mut self,
        owner: &str,
        key: &str,
        value: &Value,
        declared: Option<&'s SchemaNode>,
        path: &str,
    ) -> SchemaNode {
        let schema = self.schema;
        let declared = declared.filter(|node| !matches!(node, SchemaNode::Any));
        // objects keep the `Ref` for entity naming; arrays and scalars compare
        // against the definition it points at
        let resolved = declared.map(|node| schema.resolve(node));

        match value {
            Value::Object(map) => {
                let synthesized = format!("{owner}_{key}");
                let (wanted, origin, shape, description) = match declared {
                    Some(SchemaNode::Ref(def)) => match schema.definition(def) {
                        Some(p) if matches!(p.node, SchemaNode::Object(_) | SchemaNode::Any) => {
                            (def.clone(), format!("#/definitions/{def}"), Some(&p.node), p.description.clone())
                        }
                        Some(p) => {
                            self.mismatch(path, &p.node, value);
                            (synthesized, path.to_string(), None, None)
                        }
                        None => {
                            warn!(path, reference = %def, "unresolved $ref, falling back to a path-derived name");
                            (synthesized, path.to_string(), None, None)
                        }
                    },
                    Some(node @ SchemaNode::Object(_)) => (synthesized, path.to_string(), Some(node), None),
                    Some(other) => {
                        self.mismatch(path, other, value);
                        (synthesized, path.to_string(), None, None)
                    }
                    None => (synthesized, path.to_string(), None, None),
                };
                let child = self.entity(&wanted, &origin, path, map, shape, description);
                SchemaNode::Ref(child)
            }
            Value::Array(items) => {
                let item_declared = match resolved {
                    Some(SchemaNode::Array(item)) => Some(item.as_ref()),
                    Some(other) => {
                        self.mismatch(path, other, value);
                        None
                    }
                    None => None,
                };
                let item = match items.first() {
                    Some(first) => {
                        self.field_node(owner, key, first, item_declared, &format!("{path}[0]"))
                    }
                    None => SchemaNode::Any,
                };
                SchemaNode::array_of(item)
            }
            scalar => self.scalar(scalar, resolved, path),
        }
    }

    fn scalar(&mut self, value: &Value, declared: Option<&SchemaNode>, path: &str) -> SchemaNode {
        let observed = infer::observe(value);
        let Some(declared) = declared else {
            return observed;
        };
        match (declared, &observed) {
            (SchemaNode::Enum(def), SchemaNode::String) => {
                let listed = value
                    .as_str()
                    .is_some_and(|s| def.values.iter().any(|v| v == s));
                if listed {
                    return SchemaNode::Enum(def.clone());
                }
            }
            // integers are numbers
            (SchemaNode::Float, SchemaNode::Integer) => return observed,
            // an absent value fits any declared shape
            (_, SchemaNode::Null) => return observed,
            (d, o) if d == o => return observed,
            _ => {}
        }
        self.mismatch(path, declared, value);
        observed
    }

    fn claim(&mut self, wanted: &str, origin: &str) -> Claim {
        let mut candidate = wanted.to_string();
        let mut n = 1;
        loop {
            let ident = naming::type_ident(&candidate);
            match self.origins.get(&ident) {
                Some(claimed) if claimed == origin => return Claim::Existing(candidate),
                Some(_) => {
                    n += 1;
                    candidate = format!("{wanted}_{n}");
                }
                None => {
                    self.origins.insert(ident, origin.to_string());
                    return Claim::Fresh(candidate);
                }
            }
        }
    }

    /// A property's own description, else the one on the definition it `$ref`s.
    fn field_description(&self, property: &Property) -> Option<String> {
        property.description.clone().or_else(|| match &property.node {
            SchemaNode::Ref(def) => self.schema.definition(def).and_then(|p| p.description.clone()),
            _ => None,
        })
    }

    fn mismatch(&mut self, path: &str, declared: &SchemaNode, value: &Value) {
        let (schema, data) = (declared.kind_name(), json_kind(value));
        debug!(path, schema, data, "schema disagrees with sample; using the sample's type");
        self.mismatches.push(ShapeMismatch { path: path.to_string(), schema, data });
    }
}

fn root_object(data: &Value) -> Result<&Map<String, Value>> {
    match data {
        Value::Object(map) => Ok(map),
        Value::Array(items) => items
            .iter()
            .find_map(Value::as_object)
            .ok_or(Error::InvalidRoot { found: "an array without objects" }),
        other => Err(Error::InvalidRoot { found: json_kind(other) }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::document::SchemaDocument;
    use crate::schema::EnumDef;
    use serde_json::json;

    fn build_inferred(data: &Value) -> (Model, DependencyGraph) {
        let mut graph = DependencyGraph::new();
        let model = build(data, &Schema::inferred(data), "Root", &mut graph).unwrap();
        (model, graph)
    }

    fn build_with(data: &Value, schema: Value) -> (Model, DependencyGraph) {
        let schema = serde_json::from_value::<SchemaDocument>(schema).unwrap().into_schema();
        let mut graph = DependencyGraph::new();
        let model = build(data, &schema, "Root", &mut graph).unwrap();
        (model, graph)
    }

    fn field_types(entity: &Entity) -> Vec<(&str, &SchemaNode)> {
        entity.fields.iter().map(|f| (f.name.as_str(), &f.node)).collect()
    }

    #[test]
    fn nested_objects_become_path_named_entities() {
        let data = json!({"id": 1, "tags": ["a", "b"], "address": {"city": "X"}});
        let (model, graph) = build_inferred(&data);

        assert_eq!(model.root, "Root");
        let names: Vec<_> = model.entities.names().collect();
        assert_eq!(names, ["Root", "Root_address"]);

        let root = model.entities.get("Root").unwrap();
        assert_eq!(field_types(root), [
            ("id", &SchemaNode::Integer),
            ("tags", &SchemaNode::array_of(SchemaNode::String)),
            ("address", &SchemaNode::Ref("Root_address".into())),
        ]);
        let address = model.entities.get("Root_address").unwrap();
        assert_eq!(field_types(address), [("city", &SchemaNode::String)]);

        assert!(graph.contains_edge("Root", "Root_address"));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn field_order_follows_the_source_document() {
        let data = json!({"zeta": 1, "alpha": 2, "mid": {"b": 1, "a": 2}});
        let (model, _) = build_inferred(&data);
        let root: Vec<_> = model.entities.get("Root").unwrap().fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(root, ["zeta", "alpha", "mid"]);
        let mid: Vec<_> = model.entities.get("Root_mid").unwrap().fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(mid, ["b", "a"]);
    }

    #[test]
    fn building_twice_is_identical() {
        let data = json!({"a": {"b": {"c": [{"d": 1}]}}, "e": [], "f": null});
        let (first, g1) = build_inferred(&data);
        let (second, g2) = build_inferred(&data);
        assert_eq!(first, second);
        assert_eq!(g1, g2);
    }

    #[test]
    fn empty_array_is_unknown_element() {
        let (model, _) = build_inferred(&json!({"items": []}));
        let root = model.root_entity().unwrap();
        assert_eq!(root.fields[0].node, SchemaNode::array_of(SchemaNode::Any));
    }

    #[test]
    fn arrays_of_objects_register_entity_and_edge() {
        let (model, graph) = build_inferred(&json!({"users": [{"name": "a"}, {"other": 1}]}));
        let root = model.root_entity().unwrap();
        assert_eq!(root.fields[0].node, SchemaNode::array_of(SchemaNode::Ref("Root_users".into())));
        assert_eq!(field_types(model.entities.get("Root_users").unwrap()), [("name", &SchemaNode::String)]);
        assert!(graph.contains_edge("Root", "Root_users"));
    }

    #[test]
    fn colliding_path_names_are_disambiguated() {
        let (model, _) = build_inferred(&json!({"a_b": {"x": 1}, "a": {"b": {"y": 2}}}));
        let names: Vec<_> = model.entities.names().collect();
        assert_eq!(names, ["Root", "Root_a_b", "Root_a", "Root_a_b_2"]);
        let a = model.entities.get("Root_a").unwrap();
        assert_eq!(a.fields[0].node, SchemaNode::Ref("Root_a_b_2".into()));
    }

    #[test]
    fn sample_type_wins_over_schema() {
        let data = json!({"age": "forty", "score": 3, "name": "n"});
        let (model, _) = build_with(&data, json!({
            "type": "object",
            "properties": {
                "age": { "type": "integer", "description": "Age in years" },
                "score": { "type": "number" },
                "name": { "type": "string" }
            }
        }));
        let root = model.root_entity().unwrap();
        assert_eq!(field_types(root), [
            ("age", &SchemaNode::String),
            ("score", &SchemaNode::Integer),
            ("name", &SchemaNode::String),
        ]);
        assert_eq!(root.fields[0].description.as_deref(), Some("Age in years"));
        assert_eq!(model.mismatches, [ShapeMismatch {
            path: "$.age".into(),
            schema: "integer",
            data: "string",
        }]);
    }

    #[test]
    fn object_declared_as_scalar_still_builds_entity() {
        let (model, _) = build_with(&json!({"loc": {"lat": 1.5}}), json!({
            "properties": { "loc": { "type": "string" } }
        }));
        assert!(model.entities.contains("Root_loc"));
        assert_eq!(model.mismatches.len(), 1);
        assert_eq!(model.mismatches[0].data, "object");
    }

    #[test]
    fn listed_strings_take_enum_type() {
        let schema = json!({
            "properties": {
                "status": { "$ref": "#/definitions/Status" },
                "other": { "$ref": "#/definitions/Status" }
            },
            "definitions": { "Status": { "enum": ["active", "inactive"] } }
        });
        let (model, _) = build_with(&json!({"status": "active", "other": "gone"}), schema);
        let root = model.root_entity().unwrap();
        assert_eq!(root.fields[0].node, SchemaNode::Enum(EnumDef::new("Status", ["active", "inactive"])));
        assert_eq!(root.fields[1].node, SchemaNode::String);
        assert_eq!(model.enums.len(), 1);
        assert_eq!(model.mismatches.len(), 1);
    }

    #[test]
    fn recursive_definitions_reuse_the_entity() {
        let schema = json!({
            "properties": { "tree": { "$ref": "#/definitions/Node" } },
            "definitions": {
                "Node": {
                    "description": "A tree node",
                    "properties": {
                        "value": { "type": "integer" },
                        "children": { "type": "array", "items": { "$ref": "#/definitions/Node" } }
                    }
                }
            }
        });
        let data = json!({"tree": {"value": 1, "children": [{"value": 2, "children": []}]}});
        let (model, graph) = build_with(&data, schema);

        let names: Vec<_> = model.entities.names().collect();
        assert_eq!(names, ["Root", "Node"]);
        let node = model.entities.get("Node").unwrap();
        assert_eq!(node.description.as_deref(), Some("A tree node"));
        assert_eq!(node.fields[1].node, SchemaNode::array_of(SchemaNode::Ref("Node".into())));
        assert!(graph.contains_edge("Node", "Node"));
        assert!(graph.contains_edge("Root", "Node"));
    }

    #[test]
    fn refs_to_scalar_and_array_definitions_agree_with_the_sample() {
        let schema = json!({
            "properties": {
                "age": { "$ref": "#/definitions/Age" },
                "tags": { "$ref": "#/definitions/Tags" }
            },
            "definitions": {
                "Age": { "type": "integer", "description": "Age in years" },
                "Tags": { "type": "array", "items": { "type": "string" } }
            }
        });
        let (model, _) = build_with(&json!({"age": 3, "tags": ["a"]}), schema);
        let root = model.root_entity().unwrap();
        assert_eq!(field_types(root), [
            ("age", &SchemaNode::Integer),
            ("tags", &SchemaNode::array_of(SchemaNode::String)),
        ]);
        assert_eq!(root.fields[0].description.as_deref(), Some("Age in years"));
        assert!(model.mismatches.is_empty(), "{:?}", model.mismatches);
    }

    #[test]
    fn ref_to_array_definition_checks_its_items() {
        let schema = json!({
            "properties": { "ids": { "$ref": "#/definitions/Ids" } },
            "definitions": { "Ids": { "type": "array", "items": { "type": "integer" } } }
        });
        let (model, _) = build_with(&json!({"ids": ["x"]}), schema);
        assert_eq!(model.mismatches, [ShapeMismatch {
            path: "$.ids[0]".into(),
            schema: "integer",
            data: "string",
        }]);
    }

    #[test]
    fn ref_field_without_own_description_takes_the_definitions() {
        let schema = json!({
            "properties": {
                "home": { "$ref": "#/definitions/Place" },
                "work": { "$ref": "#/definitions/Place", "description": "Office" }
            },
            "definitions": {
                "Place": { "type": "object", "description": "A place", "properties": { "x": { "type": "integer" } } }
            }
        });
        let (model, _) = build_with(&json!({"home": {"x": 1}, "work": {"x": 2}}), schema);
        let root = model.root_entity().unwrap();
        assert_eq!(root.fields[0].description.as_deref(), Some("A place"));
        assert_eq!(root.fields[1].description.as_deref(), Some("Office"));
        assert_eq!(model.entities.get("Place").unwrap().description.as_deref(), Some("A place"));
    }

    #[test]
    fn null_sample_fits_a_declared_reference() {
        let schema = json!({
            "properties": { "next": { "$ref": "#/definitions/Link" } },
            "definitions": { "Link": { "type": "object", "properties": { "id": { "type": "integer" } } } }
        });
        let (model, _) = build_with(&json!({"next": null}), schema);
        assert_eq!(model.root_entity().unwrap().fields[0].node, SchemaNode::Null);
        assert!(model.mismatches.is_empty());
    }

    #[test]
    fn names_that_sanitize_alike_get_distinct_type_idents() {
        let (model, graph) = build_inferred(&json!({"first-name": {"a": 1}, "first_name": {"b": 2}}));
        let names: Vec<_> = model.entities.names().collect();
        assert_eq!(names, ["Root", "Root_first-name", "Root_first_name_2"]);
        let idents: std::collections::HashSet<_> = names.iter().map(|n| naming::type_ident(n)).collect();
        assert_eq!(idents.len(), names.len());
        assert!(graph.contains_edge("Root", "Root_first_name_2"));
    }

    #[test]
    fn entities_never_take_an_enum_name() {
        let schema = json!({
            "properties": { "x": { "type": "object" } },
            "definitions": { "Root_x": { "enum": ["a"] } }
        });
        let (model, _) = build_with(&json!({"x": {"y": 1}}), schema);
        let names: Vec<_> = model.entities.names().collect();
        assert_eq!(names, ["Root", "Root_x_2"]);
    }

    #[test]
    fn array_root_uses_first_object() {
        let (model, _) = build_inferred(&json!([1, {"id": 1}]));
        assert_eq!(field_types(model.root_entity().unwrap()), [("id", &SchemaNode::Integer)]);
    }

    #[test]
    fn scalar_root_is_rejected() {
        let mut graph = DependencyGraph::new();
        let data = json!("just a string");
        let err = build(&data, &Schema::inferred(&data), "Root", &mut graph).unwrap_err();
        assert!(matches!(err, Error::InvalidRoot { found: "string" }));
        let data = json!([1, 2]);
        assert!(build(&data, &Schema::inferred(&data), "Root", &mut graph).is_err());
    }

    #[test]
    fn builder_graph_matches_graph_from_entities() {
        let data = json!({"a": {"b": {"c": 1}}, "d": [{"e": {"f": 1}}], "g": {"h": 1}});
        let (model, graph) = build_inferred(&data);
        assert_eq!(graph, DependencyGraph::from_entities(&model.entities));
    }
}
