//! Kotlin: kotlinx.serialization data classes, kotlin.test round-trip test.
use std::collections::BTreeSet;

use serde_json::Value;

use super::Target;
use crate::emit::{EmitContext, TargetEmitter, TypeRules};
use crate::model::Entity;
use crate::naming::{self, Case, Escape};
use crate::schema::{EnumDef, SchemaNode};

pub struct Kotlin;

static RULES: TypeRules = TypeRules {
    null: "JsonElement?",
    boolean: "Boolean",
    integer: "Long",
    float: "Double",
    string: "String",
    any: "JsonElement",
    array: "List<$T>",
    deferred: "$T?",
    field_case: Case::Camel,
    keywords: &[
        "as", "break", "class", "continue", "do", "else", "false", "for", "fun", "if", "in",
        "interface", "is", "null", "object", "package", "return", "super", "this", "throw", "true",
        "try", "typealias", "typeof", "val", "var", "when", "while",
    ],
    escape: Escape::Wrap("`"),
};

/// Kotlin string templates start with `$`.
fn string_literal(s: &str) -> String {
    naming::quoted(s).replace('$', "\\$")
}

impl TargetEmitter for Kotlin {
    fn target(&self) -> Target {
        Target::Kotlin
    }

    fn rules(&self) -> &'static TypeRules {
        &RULES
    }

    fn emit_header(&self, cx: &EmitContext) -> String {
        let mut code = cx.code();
        code.line(0, "// Generated by json-modelgen. Do not edit.")
            .line(0, "import kotlinx.serialization.SerialName")
            .line(0, "import kotlinx.serialization.Serializable")
            .line(0, "import kotlinx.serialization.json.JsonElement")
            .blank();
        code.finish()
    }

    fn emit_enum(&self, def: &EnumDef, cx: &EmitContext) -> String {
        let constants = naming::unique(def.values.iter().map(|v| naming::convert(v, Case::Snake).to_ascii_uppercase()));
        let mut code = cx.code();
        code.line(0, "@Serializable")
            .line(0, format!("enum class {} {{", self.type_name(&def.name)));
        for (value, constant) in def.values.iter().zip(&constants) {
            code.line(1, format!("@SerialName({})", string_literal(value)))
                .line(1, format!("{constant},"));
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
        code.line(0, "@Serializable");
        if entity.fields.is_empty() {
            code.line(0, format!("class {name}"));
        } else {
            code.line(0, format!("data class {name}("));
            for (field, ident) in entity.fields.iter().zip(self.field_idents(entity)) {
                if let Some(doc) = cx.doc(field) {
                    code.line(1, format!("/** {doc} */"));
                }
                let default = if deferred.contains(&field.name) && matches!(field.node, SchemaNode::Ref(_)) {
                    " = null"
                } else {
                    ""
                };
                code.line(1, format!("@SerialName({})", string_literal(&field.name)))
                    .line(1, format!("val {ident}: {}{default},", self.field_type(field, deferred)));
            }
            code.line(0, ")");
        }
        code.blank();

        if cx.validation() {
            code.line(0, format!("fun {name}.isValid(): Boolean = true")).blank();
        }
        code.finish()
    }

    fn emit_tests(&self, root: &Entity, sample: &Value, cx: &EmitContext) -> String {
        let name = self.type_name(&root.name);
        let mut code = cx.code();
        code.line(0, "import kotlin.test.Test")
            .line(0, "import kotlin.test.assertEquals")
            .line(0, "import kotlinx.serialization.json.Json")
            .line(0, "import kotlinx.serialization.json.encodeToJsonElement")
            .blank()
            .line(0, format!("class {name}Test {{"))
            .line(1, "@Test")
            .line(1, "fun roundTrips() {")
            .line(2, format!("val sample = {}", string_literal(&sample.to_string())))
            .line(2, format!("val value = Json.decodeFromString<{name}>(sample)"))
            .line(2, "assertEquals(Json.parseToJsonElement(sample), Json.encodeToJsonElement(value))")
            .line(1, "}")
            .line(0, "}");
        code.finish()
    }
}
