//! Go: tagged structs and typed string constants, `testing` round-trip test.
use std::collections::BTreeSet;

use serde_json::Value;

use super::Target;
use crate::emit::{EmitContext, TargetEmitter, TypeRules};
use crate::model::Entity;
use crate::naming::{self, Case, Escape};
use crate::schema::EnumDef;

pub struct Go;

static RULES: TypeRules = TypeRules {
    null: "interface{}",
    boolean: "bool",
    integer: "int64",
    float: "float64",
    string: "string",
    any: "interface{}",
    array: "[]$T",
    deferred: "*$T",
    field_case: Case::Pascal,
    keywords: &[],
    escape: Escape::Suffix("_"),
};

fn package(cx: &EmitContext) -> String {
    naming::convert(cx.module(), Case::Snake).replace('_', "")
}

impl TargetEmitter for Go {
    fn target(&self) -> Target {
        Target::Go
    }

    fn rules(&self) -> &'static TypeRules {
        &RULES
    }

    fn emit_header(&self, cx: &EmitContext) -> String {
        let mut code = cx.code();
        code.line(0, "// Code generated by json-modelgen. DO NOT EDIT.")
            .blank()
            .line(0, format!("package {}", package(cx)))
            .blank();
        code.finish()
    }

    fn emit_enum(&self, def: &EnumDef, cx: &EmitContext) -> String {
        let name = self.type_name(&def.name);
        let consts = naming::unique(def.values.iter().map(|v| format!("{name}{}", naming::convert(v, Case::Pascal))));
        let mut code = cx.code();
        code.line(0, format!("type {name} string")).blank().line(0, "const (");
        for (value, constant) in def.values.iter().zip(&consts) {
            code.line(1, format!("{constant} {name} = {}", naming::quoted(value)));
        }
        code.line(0, ")").blank();
        code.finish()
    }

    fn emit_entity(&self, entity: &Entity, deferred: &BTreeSet<String>, cx: &EmitContext) -> String {
        let name = self.type_name(&entity.name);
        let mut code = cx.code();
        if let Some(doc) = cx.entity_doc(entity) {
            code.line(0, format!("// {doc}"));
        }
        code.line(0, format!("type {name} struct {{"));
        for (field, ident) in entity.fields.iter().zip(self.field_idents(entity)) {
            if let Some(doc) = cx.doc(field) {
                code.line(1, format!("// {doc}"));
            }
            let tag = format!("`json:{}`", naming::quoted(&field.name));
            code.line(1, format!("{ident} {} {tag}", self.field_type(field, deferred)));
        }
        code.line(0, "}").blank();

        if cx.validation() {
            code.line(0, format!("func (m *{name}) IsValid() bool {{"))
                .line(1, "return m != nil")
                .line(0, "}")
                .blank();
        }
        code.finish()
    }

    fn emit_tests(&self, root: &Entity, sample: &Value, cx: &EmitContext) -> String {
        let name = self.type_name(&root.name);
        let mut code = cx.code();
        code.line(0, format!("package {}", package(cx)))
            .blank()
            .line(0, "import (")
            .line(1, "\"encoding/json\"")
            .line(1, "\"reflect\"")
            .line(1, "\"testing\"")
            .line(0, ")")
            .blank()
            .line(0, format!("func Test{}RoundTrip(t *testing.T) {{", naming::convert(&root.name, Case::Pascal)))
            .line(1, format!("sample := []byte({})", naming::quoted(&sample.to_string())))
            .line(1, format!("var value {name}"))
            .line(1, "if err := json.Unmarshal(sample, &value); err != nil {")
            .line(2, "t.Fatal(err)")
            .line(1, "}")
            .line(1, "encoded, err := json.Marshal(value)")
            .line(1, "if err != nil {")
            .line(2, "t.Fatal(err)")
            .line(1, "}")
            .line(1, "var original, decoded interface{}")
            .line(1, "_ = json.Unmarshal(sample, &original)")
            .line(1, "_ = json.Unmarshal(encoded, &decoded)")
            .line(1, "if !reflect.DeepEqual(original, decoded) {")
            .line(2, "t.Errorf(\"round trip mismatch: %s\", encoded)")
            .line(1, "}")
            .line(0, "}");
        code.finish()
    }
}
