//! Rust: serde-derived structs and unit enums.
use std::collections::BTreeSet;

use serde_json::Value;

use super::Target;
use crate::emit::{EmitContext, TargetEmitter, TypeRules};
use crate::model::Entity;
use crate::naming::{self, Case, Escape};
use crate::schema::EnumDef;

pub struct Rust;

static RULES: TypeRules = TypeRules {
    null: "Option<serde_json::Value>",
    boolean: "bool",
    integer: "i64",
    float: "f64",
    string: "String",
    any: "serde_json::Value",
    array: "Vec<$T>",
    deferred: "Option<Box<$T>>",
    field_case: Case::Snake,
    keywords: &[
        "as", "async", "await", "box", "break", "const", "continue", "crate", "dyn", "else", "enum",
        "extern", "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod",
        "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait",
        "true", "try", "type", "unsafe", "use", "where", "while", "yield",
    ],
    escape: Escape::Suffix("_"),
};

/// A raw string literal with enough `#`s to hold `s`.
fn raw_string(s: &str) -> String {
    let mut hashes = 1;
    while s.contains(&format!("\"{}", "#".repeat(hashes))) {
        hashes += 1;
    }
    let fence = "#".repeat(hashes);
    format!("r{fence}\"{s}\"{fence}")
}

impl TargetEmitter for Rust {
    fn target(&self) -> Target {
        Target::Rust
    }

    fn rules(&self) -> &'static TypeRules {
        &RULES
    }

    fn emit_header(&self, cx: &EmitContext) -> String {
        let mut code = cx.code();
        code.line(0, "// Generated by json-modelgen. Do not edit.")
            .line(0, "use serde::{Deserialize, Serialize};")
            .blank();
        code.finish()
    }

    fn emit_enum(&self, def: &EnumDef, cx: &EmitContext) -> String {
        let variants = naming::unique(def.values.iter().map(|v| {
            naming::escape_keyword(naming::convert(v, Case::Pascal), RULES.keywords, RULES.escape)
        }));
        let mut code = cx.code();
        code.line(0, "#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]")
            .line(0, format!("pub enum {} {{", self.type_name(&def.name)));
        for (value, variant) in def.values.iter().zip(&variants) {
            code.line(1, format!("#[serde(rename = {})]", naming::quoted(value)))
                .line(1, format!("{variant},"));
        }
        code.line(0, "}").blank();
        code.finish()
    }

    fn emit_entity(&self, entity: &Entity, deferred: &BTreeSet<String>, cx: &EmitContext) -> String {
        let name = self.type_name(&entity.name);
        let mut code = cx.code();
        if let Some(doc) = cx.entity_doc(entity) {
            code.line(0, format!("/// {doc}"));
        }
        code.line(0, "#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]")
            .line(0, format!("pub struct {name} {{"));
        for (field, ident) in entity.fields.iter().zip(self.field_idents(entity)) {
            if let Some(doc) = cx.doc(field) {
                code.line(1, format!("/// {doc}"));
            }
            if ident != field.name {
                code.line(1, format!("#[serde(rename = {})]", naming::quoted(&field.name)));
            }
            code.line(1, format!("pub {ident}: {},", self.field_type(field, deferred)));
        }
        code.line(0, "}").blank();

        if cx.validation() {
            code.line(0, format!("impl {name} {{"))
                .line(1, "pub fn is_valid(&self) -> bool {")
                .line(2, "true")
                .line(1, "}")
                .line(0, "}")
                .blank();
        }
        code.finish()
    }

    fn emit_tests(&self, root: &Entity, sample: &Value, cx: &EmitContext) -> String {
        let name = self.type_name(&root.name);
        let mut code = cx.code();
        code.line(0, "// Generated by json-modelgen. Do not edit.")
            .line(0, format!("// Include from the model module with `#[cfg(test)] #[path = \"{}_test.rs\"] mod tests;`.", cx.module()))
            .line(0, "use super::*;")
            .blank()
            .line(0, "#[test]")
            .line(0, format!("fn {}_round_trips() {{", naming::convert(&root.name, Case::Snake)))
            .line(1, format!("let sample = {};", raw_string(&sample.to_string())))
            .line(1, format!("let value: {name} = serde_json::from_str(sample).unwrap();"))
            .line(1, "let original: serde_json::Value = serde_json::from_str(sample).unwrap();")
            .line(1, "assert_eq!(serde_json::to_value(&value).unwrap(), original);");
        if cx.validation() {
            code.line(1, "assert!(value.is_valid());");
        }
        code.line(0, "}");
        code.finish()
    }
}
