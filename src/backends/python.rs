//! Python: pydantic models and string enums, unittest round-trip test.
use std::collections::BTreeSet;

use serde_json::Value;

use super::Target;
use crate::emit::{EmitContext, TargetEmitter, TypeRules};
use crate::model::Entity;
use crate::naming::{self, Case, Escape};
use crate::schema::EnumDef;

pub struct Python;

static RULES: TypeRules = TypeRules {
    null: "Optional[Any]",
    boolean: "bool",
    integer: "int",
    float: "float",
    string: "str",
    any: "Any",
    array: "List[$T]",
    deferred: "Optional[$T]",
    field_case: Case::Snake,
    keywords: &[
        "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
        "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
        "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
        "try", "while", "with", "yield",
    ],
    escape: Escape::Suffix("_"),
};

impl TargetEmitter for Python {
    fn target(&self) -> Target {
        Target::Python
    }

    fn rules(&self) -> &'static TypeRules {
        &RULES
    }

    fn emit_header(&self, cx: &EmitContext) -> String {
        let mut code = cx.code();
        code.line(0, "# Generated by json-modelgen. Do not edit.")
            .line(0, "from __future__ import annotations")
            .blank()
            .line(0, "from enum import Enum")
            .line(0, "from typing import Any, List, Optional")
            .blank()
            .line(0, "from pydantic import BaseModel, ConfigDict, Field")
            .blank();
        code.finish()
    }

    fn emit_enum(&self, def: &EnumDef, cx: &EmitContext) -> String {
        let members = naming::unique(def.values.iter().map(|v| naming::convert(v, Case::Snake).to_ascii_uppercase()));
        let mut code = cx.code();
        code.blank().line(0, format!("class {}(str, Enum):", self.type_name(&def.name)));
        for (value, member) in def.values.iter().zip(&members) {
            code.line(1, format!("{member} = {}", naming::quoted(value)));
        }
        code.blank();
        code.finish()
    }

    fn emit_entity(&self, entity: &Entity, deferred: &BTreeSet<String>, cx: &EmitContext) -> String {
        let name = self.type_name(&entity.name);
        let mut code = cx.code();
        code.blank().line(0, format!("class {name}(BaseModel):"));
        if let Some(doc) = cx.entity_doc(entity) {
            code.line(1, format!("\"\"\"{doc}\"\"\""));
        }
        code.line(1, "model_config = ConfigDict(populate_by_name=True)").blank();
        for (field, ident) in entity.fields.iter().zip(self.field_idents(entity)) {
            if let Some(doc) = cx.doc(field) {
                code.line(1, format!("# {doc}"));
            }
            let ty = self.field_type(field, deferred);
            let mut args = Vec::new();
            if deferred.contains(&field.name) {
                args.push("default=None".to_string());
            }
            if ident != field.name {
                args.push(format!("alias={}", naming::quoted(&field.name)));
            }
            if args.is_empty() {
                code.line(1, format!("{ident}: {ty}"));
            } else {
                code.line(1, format!("{ident}: {ty} = Field({})", args.join(", ")));
            }
        }

        if cx.validation() {
            code.blank()
                .line(1, "def is_valid(self) -> bool:")
                .line(2, "return True");
        }
        code.blank();
        code.finish()
    }

    /// Models with forward references are rebuilt once everything is defined.
    fn emit_footer(&self, cx: &EmitContext) -> String {
        let mut code = cx.code();
        for entity in cx.plan.ordered_entities() {
            if !cx.plan.deferred_for(&entity.name).is_empty() {
                code.line(0, format!("{}.model_rebuild()", self.type_name(&entity.name)));
            }
        }
        code.finish()
    }

    fn emit_tests(&self, root: &Entity, sample: &Value, cx: &EmitContext) -> String {
        let name = self.type_name(&root.name);
        let mut code = cx.code();
        code.line(0, "import json")
            .line(0, "import unittest")
            .blank()
            .line(0, format!("from {} import {name}", cx.module()))
            .blank()
            .blank()
            .line(0, format!("class Test{name}(unittest.TestCase):"))
            .line(1, "def test_round_trip(self):")
            .line(2, format!("sample = {}", naming::quoted(&sample.to_string())))
            .line(2, format!("value = {name}.model_validate_json(sample)"))
            .line(2, "self.assertEqual(json.loads(value.model_dump_json(by_alias=True)), json.loads(sample))")
            .blank()
            .blank()
            .line(0, "if __name__ == \"__main__\":")
            .line(1, "unittest.main()");
        code.finish()
    }
}
