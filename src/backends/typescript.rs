//! TypeScript: exported interfaces and string enums, jest round-trip test.
use std::collections::BTreeSet;

use serde_json::Value;

use super::Target;
use crate::emit::{EmitContext, TargetEmitter, TypeRules};
use crate::model::Entity;
use crate::naming::{self, Case, Escape};
use crate::schema::EnumDef;

pub struct TypeScript;

static RULES: TypeRules = TypeRules {
    null: "null",
    boolean: "boolean",
    integer: "number",
    float: "number",
    string: "string",
    any: "unknown",
    array: "Array<$T>",
    deferred: "$T | null",
    field_case: Case::Preserve,
    keywords: &[],
    escape: Escape::Prefix(""),
};

impl TargetEmitter for TypeScript {
    fn target(&self) -> Target {
        Target::TypeScript
    }

    fn rules(&self) -> &'static TypeRules {
        &RULES
    }

    /// Property names are the JSON keys, quoted when they are not plain
    /// identifiers.
    fn field_idents(&self, entity: &Entity) -> Vec<String> {
        entity
            .fields
            .iter()
            .map(|f| if naming::is_identifier(&f.name) { f.name.clone() } else { naming::quoted(&f.name) })
            .collect()
    }

    fn emit_header(&self, cx: &EmitContext) -> String {
        let mut code = cx.code();
        code.line(0, "// Generated by json-modelgen. Do not edit.").blank();
        code.finish()
    }

    fn emit_enum(&self, def: &EnumDef, cx: &EmitContext) -> String {
        let members = naming::unique(def.values.iter().map(|v| naming::convert(v, Case::Pascal)));
        let mut code = cx.code();
        code.line(0, format!("export enum {} {{", self.type_name(&def.name)));
        for (value, member) in def.values.iter().zip(&members) {
            code.line(1, format!("{member} = {},", naming::quoted(value)));
        }
        code.line(0, "}").blank();
        code.finish()
    }

    fn emit_entity(&self, entity: &Entity, deferred: &BTreeSet<String>, cx: &EmitContext) -> String {
        let name = self.type_name(&entity.name);
        let mut code = cx.code();
        if let Some(doc) = cx.entity_doc(entity) {
            code.line(0, format!("/** {doc} */"));
        }
        code.line(0, format!("export interface {name} {{"));
        for (field, ident) in entity.fields.iter().zip(self.field_idents(entity)) {
            if let Some(doc) = cx.doc(field) {
                code.line(1, format!("/** {doc} */"));
            }
            code.line(1, format!("{ident}: {};", self.field_type(field, deferred)));
        }
        code.line(0, "}").blank();

        if cx.validation() {
            code.line(0, format!("export function is{name}Valid(value: {name}): boolean {{"))
                .line(1, "return value !== null && typeof value === \"object\";")
                .line(0, "}")
                .blank();
        }
        code.finish()
    }

    fn emit_tests(&self, root: &Entity, sample: &Value, cx: &EmitContext) -> String {
        let name = self.type_name(&root.name);
        let mut code = cx.code();
        code.line(0, format!("import {{ {name} }} from \"./{}\";", cx.module()))
            .blank()
            .line(0, format!("describe(\"{name}\", () => {{"))
            .line(1, "it(\"round-trips through JSON\", () => {")
            .line(2, format!("const sample = {};", naming::quoted(&sample.to_string())))
            .line(2, format!("const value: {name} = JSON.parse(sample);"))
            .line(2, "expect(JSON.parse(JSON.stringify(value))).toEqual(JSON.parse(sample));")
            .line(1, "});")
            .line(0, "});");
        code.finish()
    }
}
