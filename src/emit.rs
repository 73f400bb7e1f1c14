//! Emission framework.
//!
//! A backend implements [`TargetEmitter`] as a set of pure functions from a
//! model fragment to text. [`render`] owns everything else: it calls the
//! header once, each enum once, each entity once in the resolved
//! dependencies-first order, then the footer, and finally the tests for the
//! root entity. No backend ever sees an entity before the entities it depends
//! on, except across a deferred field.
use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, debug_span, info};

use crate::backends::Target;
use crate::error::Result;
use crate::graph::{detect_cycles, resolve, BrokenEdge, Cycle, DependencyGraph, Resolution};
use crate::model::{Entity, Field, Model};
use crate::naming::{self, Case, Escape};
use crate::schema::{EnumDef, SchemaNode};

// ------------------------------- Options --------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    pub indent_size: usize,
    pub generate_docs: bool,
    pub generate_validation: bool,
    /// Module, package or namespace the output lives in; usually the output
    /// file stem.
    pub module: String,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            indent_size: 4,
            generate_docs: false,
            generate_validation: false,
            module: "model".to_string(),
        }
    }
}

/// Type mapping table of one target. Templates mark the wrapped type with
/// `$T`.
#[derive(Debug, Clone, Copy)]
pub struct TypeRules {
    pub null: &'static str,
    pub boolean: &'static str,
    pub integer: &'static str,
    pub float: &'static str,
    pub string: &'static str,
    /// Unknown element type, also used for nested maps with no entity.
    pub any: &'static str,
    pub array: &'static str,
    /// Nullable, indirect reference used for deferred fields.
    pub deferred: &'static str,
    pub field_case: Case,
    pub keywords: &'static [&'static str],
    pub escape: Escape,
}

impl TypeRules {
    pub fn fill(template: &str, inner: &str) -> String {
        template.replace("$T", inner)
    }
}

// ------------------------------- Context --------------------------------- //

/// Read-only facts a backend may consult while rendering.
pub struct EmitContext<'a> {
    pub plan: &'a EmissionPlan,
    pub options: &'a EmitOptions,
}

impl EmitContext<'_> {
    pub fn indent(&self, level: usize) -> String {
        " ".repeat(self.options.indent_size * level)
    }

    /// The field description, when docs are enabled and one exists.
    pub fn doc(&self, field: &Field) -> Option<String> {
        match (&field.description, self.options.generate_docs) {
            (Some(text), true) => Some(naming::comment_text(text)),
            _ => None,
        }
    }

    pub fn entity_doc(&self, entity: &Entity) -> Option<String> {
        match (&entity.description, self.options.generate_docs) {
            (Some(text), true) => Some(naming::comment_text(text)),
            _ => None,
        }
    }

    pub fn validation(&self) -> bool {
        self.options.generate_validation
    }

    /// Whether some field refers to `entity` through a broken edge.
    pub fn is_forward_referenced(&self, entity: &str) -> bool {
        self.plan.resolution.broken.iter().any(|e| e.to == entity)
    }

    pub fn model(&self) -> &Model {
        &self.plan.model
    }

    /// Raw module name, e.g. for file-relative imports.
    pub fn module(&self) -> &str {
        &self.options.module
    }

    /// Module name as a type-like identifier (`user_data` → `UserData`).
    pub fn module_type(&self) -> String {
        naming::convert(&self.options.module, Case::Pascal)
    }

    pub fn code(&self) -> Code {
        Code { out: String::new(), unit: self.indent(1) }
    }
}

/// Line buffer indenting with the run's indent unit.
pub struct Code {
    out: String,
    unit: String,
}

impl Code {
    pub fn line(&mut self, level: usize, text: impl AsRef<str>) -> &mut Self {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..level {
                self.out.push_str(&self.unit);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.out.push('\n');
        self
    }

    pub fn finish(self) -> String {
        self.out
    }
}

// ------------------------------- Contract -------------------------------- //

/// Capability set of one target language.
///
/// Every `emit_*` method returns the text for its fragment; none of them
/// writes anywhere or keeps state between calls.
pub trait TargetEmitter: Sync {
    fn target(&self) -> Target;

    fn rules(&self) -> &'static TypeRules;

    fn emit_header(&self, cx: &EmitContext) -> String;

    fn emit_enum(&self, def: &EnumDef, cx: &EmitContext) -> String;

    /// `deferred` names the fields of `entity` whose reference was broken to
    /// make the emission graph acyclic.
    fn emit_entity(&self, entity: &Entity, deferred: &BTreeSet<String>, cx: &EmitContext) -> String;

    fn emit_footer(&self, _cx: &EmitContext) -> String {
        String::new()
    }

    fn emit_tests(&self, root: &Entity, sample: &Value, cx: &EmitContext) -> String;

    /// Token for a leaf shape. Composite shapes go through [`Self::render_type`].
    fn map_primitive_type(&self, node: &SchemaNode) -> String {
        let rules = self.rules();
        match node {
            SchemaNode::Null => rules.null,
            SchemaNode::Bool => rules.boolean,
            SchemaNode::Integer => rules.integer,
            SchemaNode::Float => rules.float,
            SchemaNode::String => rules.string,
            _ => rules.any,
        }
        .to_string()
    }

    fn type_name(&self, name: &str) -> String {
        naming::type_ident(name)
    }

    /// How a field spells a reference to another entity.
    fn entity_type(&self, name: &str) -> String {
        self.type_name(name)
    }

    fn enum_type(&self, def: &EnumDef) -> String {
        self.type_name(&def.name)
    }

    fn render_type(&self, node: &SchemaNode) -> String {
        match node {
            SchemaNode::Array(item) => TypeRules::fill(self.rules().array, &self.render_type(item)),
            SchemaNode::Ref(name) => self.entity_type(name),
            SchemaNode::Enum(def) => self.enum_type(def),
            leaf => self.map_primitive_type(leaf),
        }
    }

    /// Field type, wrapping a direct entity reference in the deferred
    /// template. Arrays already hold their elements indirectly.
    fn field_type(&self, field: &Field, deferred: &BTreeSet<String>) -> String {
        let ty = self.render_type(&field.node);
        if matches!(field.node, SchemaNode::Ref(_)) && deferred.contains(&field.name) {
            TypeRules::fill(self.rules().deferred, &ty)
        } else {
            ty
        }
    }

    /// Field identifiers in field order: case-converted, keyword-escaped and
    /// unique within the entity.
    fn field_idents(&self, entity: &Entity) -> Vec<String> {
        let rules = self.rules();
        naming::unique(entity.fields.iter().map(|f| {
            naming::escape_keyword(naming::convert(&f.name, rules.field_case), rules.keywords, rules.escape)
        }))
    }
}

// -------------------------------- Plan ----------------------------------- //

/// A model with its cycles resolved, shared read-only by every backend.
#[derive(Debug, Clone, Serialize)]
pub struct EmissionPlan {
    pub model: Model,
    pub graph: DependencyGraph,
    pub cycles: Vec<Cycle>,
    pub resolution: Resolution,
    /// Entity name → names of its deferred fields.
    pub deferred: BTreeMap<String, BTreeSet<String>>,
}

static NO_DEFERRED: BTreeSet<String> = BTreeSet::new();

impl EmissionPlan {
    pub fn prepare(model: Model, graph: DependencyGraph) -> Result<Self> {
        let _span = debug_span!("plan", root = %model.root).entered();
        let cycles = detect_cycles(&graph);
        for cycle in &cycles {
            info!(entities = %cycle.entities().join(" -> "), "dependency cycle detected");
        }
        let resolution = resolve(&graph, &cycles)?;
        let deferred = deferred_fields(&model, &resolution.broken);
        debug!(order = ?resolution.order, "emission order");
        Ok(Self { model, graph, cycles, resolution, deferred })
    }

    pub fn deferred_for(&self, entity: &str) -> &BTreeSet<String> {
        self.deferred.get(entity).unwrap_or(&NO_DEFERRED)
    }

    /// Entities in emission order.
    pub fn ordered_entities(&self) -> impl Iterator<Item = &Entity> {
        self.resolution.order.iter().filter_map(|name| self.model.entities.get(name))
    }

    pub fn deferred_count(&self) -> usize {
        self.deferred.values().map(BTreeSet::len).sum()
    }
}

/// Every field of `from` whose type names `to`, for each broken edge.
fn deferred_fields(model: &Model, broken: &[BrokenEdge]) -> BTreeMap<String, BTreeSet<String>> {
    let mut deferred = BTreeMap::<String, BTreeSet<String>>::new();
    for edge in broken {
        let Some(entity) = model.entities.get(&edge.from) else { continue };
        for (field, target) in entity.references() {
            if target == edge.to {
                deferred.entry(edge.from.clone()).or_default().insert(field.name.clone());
            }
        }
    }
    deferred
}

// ------------------------------- Driver ---------------------------------- //

/// Output of one backend over one plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub target: Target,
    pub source: String,
    pub tests: String,
    pub extension: &'static str,
}

pub fn render<E>(emitter: &E, plan: &EmissionPlan, options: &EmitOptions) -> Rendered
where
    E: TargetEmitter + ?Sized,
{
    let target = emitter.target();
    let _span = debug_span!("emit", language = %target).entered();
    let cx = EmitContext { plan, options };

    let mut source = emitter.emit_header(&cx);

    let mut enums = HashSet::<&str>::new();
    for def in &plan.model.enums {
        if enums.insert(&def.name) {
            source.push_str(&emitter.emit_enum(def, &cx));
        }
    }

    let mut emitted = HashSet::<&str>::new();
    for entity in plan.ordered_entities() {
        let deferred = plan.deferred_for(&entity.name);
        debug_assert!(
            entity
                .references()
                .all(|(f, to)| deferred.contains(&f.name) || emitted.contains(to)),
            "{} emitted before one of its dependencies",
            entity.name
        );
        let fresh = emitted.insert(&entity.name);
        debug_assert!(fresh, "{} emitted twice", entity.name);
        source.push_str(&emitter.emit_entity(entity, deferred, &cx));
    }
    source.push_str(&emitter.emit_footer(&cx));

    let tests = match plan.model.root_entity() {
        Some(root) => emitter.emit_tests(root, &root_sample(root), &cx),
        None => String::new(),
    };
    debug!(entities = emitted.len(), bytes = source.len(), "rendered");

    Rendered { target, source, tests, extension: target.extension() }
}

/// The root object as it appeared in the input, rebuilt from field samples.
pub fn root_sample(root: &Entity) -> Value {
    let object: Map<String, Value> = root
        .fields
        .iter()
        .map(|f| (f.name.clone(), f.sample.clone().unwrap_or(Value::Null)))
        .collect();
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntitySet;
    use std::sync::Mutex;

    static RULES: TypeRules = TypeRules {
        null: "null",
        boolean: "bool",
        integer: "int",
        float: "float",
        string: "str",
        any: "any",
        array: "[$T]",
        deferred: "later<$T>",
        field_case: Case::Snake,
        keywords: &["type"],
        escape: Escape::Suffix("_"),
    };

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<String>>,
    }

    impl Recording {
        fn record(&self, call: String) -> String {
            self.calls.lock().unwrap().push(call.clone());
            call + "\n"
        }
    }

    impl TargetEmitter for Recording {
        fn target(&self) -> Target {
            Target::Rust
        }
        fn rules(&self) -> &'static TypeRules {
            &RULES
        }
        fn emit_header(&self, _: &EmitContext) -> String {
            self.record("header".into())
        }
        fn emit_enum(&self, def: &EnumDef, _: &EmitContext) -> String {
            self.record(format!("enum {}", def.name))
        }
        fn emit_entity(&self, entity: &Entity, deferred: &BTreeSet<String>, _: &EmitContext) -> String {
            let fields: Vec<_> = entity.fields.iter().map(|f| format!("{}:{}", f.name, self.field_type(f, deferred))).collect();
            self.record(format!("entity {} {}", entity.name, fields.join(",")))
        }
        fn emit_footer(&self, _: &EmitContext) -> String {
            self.record("footer".into())
        }
        fn emit_tests(&self, root: &Entity, sample: &Value, _: &EmitContext) -> String {
            self.record(format!("tests {} {sample}", root.name))
        }
    }

    fn cyclic_model() -> (Model, DependencyGraph) {
        let status = EnumDef::new("Status", ["on", "off"]);
        let mut id = Field::new("id", SchemaNode::Integer);
        id.sample = Some(Value::from(7));
        let entities: EntitySet = [
            Entity::new("Root", vec![id, Field::new("a", SchemaNode::Ref("A".into()))]),
            Entity::new("A", vec![
                Field::new("b", SchemaNode::Ref("B".into())),
                Field::new("status", SchemaNode::Enum(status.clone())),
            ]),
            Entity::new("B", vec![
                Field::new("a", SchemaNode::Ref("A".into())),
                Field::new("all_a", SchemaNode::array_of(SchemaNode::Ref("A".into()))),
            ]),
        ]
        .into_iter()
        .collect();
        let graph = DependencyGraph::from_entities(&entities);
        let model = Model { root: "Root".into(), entities, enums: vec![status.clone(), status], mismatches: vec![] };
        (model, graph)
    }

    #[test]
    fn drives_each_fragment_once_in_dependency_order() {
        let (model, graph) = cyclic_model();
        let plan = EmissionPlan::prepare(model, graph).unwrap();
        let emitter = Recording::default();
        let rendered = render(&emitter, &plan, &EmitOptions::default());

        let calls = emitter.calls.lock().unwrap().clone();
        assert_eq!(calls, [
            "header",
            "enum Status",
            "entity B a:later<A>,all_a:[A]",
            "entity A b:B,status:Status",
            "entity Root id:int,a:A",
            "footer",
            "tests Root {\"id\":7,\"a\":null}",
        ]);
        assert_eq!(rendered.extension, "rs");
        assert!(rendered.tests.starts_with("tests Root"));
    }

    #[test]
    fn every_field_behind_a_broken_edge_is_deferred() {
        let (model, graph) = cyclic_model();
        let plan = EmissionPlan::prepare(model, graph).unwrap();
        assert_eq!(plan.cycles.len(), 1);
        assert_eq!(plan.resolution.broken, [BrokenEdge::new("B", "A")]);
        assert_eq!(plan.deferred_for("B"), &BTreeSet::from(["a".to_string(), "all_a".to_string()]));
        assert!(plan.deferred_for("A").is_empty());
        assert_eq!(plan.deferred_count(), 2);
    }

    #[test]
    fn acyclic_plan_defers_nothing() {
        let entities: EntitySet = [
            Entity::new("Root", vec![Field::new("address", SchemaNode::Ref("Root_address".into()))]),
            Entity::new("Root_address", vec![Field::new("city", SchemaNode::String)]),
        ]
        .into_iter()
        .collect();
        let graph = DependencyGraph::from_entities(&entities);
        let model = Model { root: "Root".into(), entities, enums: vec![], mismatches: vec![] };
        let plan = EmissionPlan::prepare(model, graph).unwrap();
        assert!(plan.cycles.is_empty());
        assert_eq!(plan.deferred_count(), 0);
        let order: Vec<_> = plan.ordered_entities().map(|e| e.name.as_str()).collect();
        assert_eq!(order, ["Root_address", "Root"]);
    }

    #[test]
    fn field_idents_are_escaped_and_unique() {
        let entity = Entity::new("E", vec![
            Field::new("type", SchemaNode::String),
            Field::new("firstName", SchemaNode::String),
            Field::new("first_name", SchemaNode::String),
        ]);
        assert_eq!(Recording::default().field_idents(&entity), ["type_", "first_name", "first_name_2"]);
    }
}
