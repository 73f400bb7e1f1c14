//! C#: System.Text.Json classes in a file-scoped namespace, xUnit test.
use std::collections::BTreeSet;

use serde_json::Value;

use super::Target;
use crate::emit::{EmitContext, TargetEmitter, TypeRules};
use crate::model::Entity;
use crate::naming::{self, Case, Escape};
use crate::schema::EnumDef;

pub struct CSharp;

static RULES: TypeRules = TypeRules {
    null: "object?",
    boolean: "bool",
    integer: "long",
    float: "double",
    string: "string",
    any: "JsonElement",
    array: "List<$T>",
    deferred: "$T?",
    field_case: Case::Pascal,
    keywords: &[],
    escape: Escape::Prefix("@"),
};

impl TargetEmitter for CSharp {
    fn target(&self) -> Target {
        Target::CSharp
    }

    fn rules(&self) -> &'static TypeRules {
        &RULES
    }

    fn emit_header(&self, cx: &EmitContext) -> String {
        let mut code = cx.code();
        code.line(0, "// <auto-generated>Generated by json-modelgen. Do not edit.</auto-generated>")
            .line(0, "#nullable enable")
            .line(0, "using System.Collections.Generic;")
            .line(0, "using System.Text.Json;")
            .line(0, "using System.Text.Json.Serialization;")
            .blank()
            .line(0, format!("namespace {};", cx.module_type()))
            .blank();
        code.finish()
    }

    fn emit_enum(&self, def: &EnumDef, cx: &EmitContext) -> String {
        let members = naming::unique(def.values.iter().map(|v| naming::convert(v, Case::Pascal)));
        let mut code = cx.code();
        code.line(0, "[JsonConverter(typeof(JsonStringEnumConverter))]")
            .line(0, format!("public enum {}", self.type_name(&def.name)))
            .line(0, "{");
        for (value, member) in def.values.iter().zip(&members) {
            code.line(1, format!("[JsonStringEnumMemberName({})]", naming::quoted(value)))
                .line(1, format!("{member},"));
        }
        code.line(0, "}").blank();
        code.finish()
    }

    fn emit_entity(&self, entity: &Entity, deferred: &BTreeSet<String>, cx: &EmitContext) -> String {
        let name = self.type_name(&entity.name);
        let mut code = cx.code();
        if let Some(doc) = cx.entity_doc(entity) {
            code.line(0, format!("/// <summary>{doc}</summary>"));
        }
        code.line(0, format!("public class {name}")).line(0, "{");
        for (i, (field, ident)) in entity.fields.iter().zip(self.field_idents(entity)).enumerate() {
            if i > 0 {
                code.blank();
            }
            if let Some(doc) = cx.doc(field) {
                code.line(1, format!("/// <summary>{doc}</summary>"));
            }
            // a member may not share its enclosing type's name
            let ident = if ident == name { format!("{ident}Value") } else { ident };
            code.line(1, format!("[JsonPropertyName({})]", naming::quoted(&field.name)))
                .line(1, format!("public {} {ident} {{ get; set; }} = default!;", self.field_type(field, deferred)));
        }
        if cx.validation() {
            code.blank().line(1, "public bool IsValid() => true;");
        }
        code.line(0, "}").blank();
        code.finish()
    }

    fn emit_tests(&self, root: &Entity, sample: &Value, cx: &EmitContext) -> String {
        let name = self.type_name(&root.name);
        let mut code = cx.code();
        code.line(0, "using System.Text.Json;")
            .line(0, "using System.Text.Json.Nodes;")
            .line(0, "using Xunit;")
            .blank()
            .line(0, format!("namespace {}.Tests;", cx.module_type()))
            .blank()
            .line(0, format!("public class {name}Tests"))
            .line(0, "{")
            .line(1, "[Fact]")
            .line(1, "public void RoundTrips()")
            .line(1, "{")
            .line(2, format!("const string sample = {};", naming::quoted(&sample.to_string())))
            .line(2, format!("var value = JsonSerializer.Deserialize<{name}>(sample);"))
            .line(2, "var original = JsonNode.Parse(sample);")
            .line(2, "var serialized = JsonNode.Parse(JsonSerializer.Serialize(value));")
            .line(2, "Assert.True(JsonNode.DeepEquals(original, serialized));")
            .line(1, "}")
            .line(0, "}");
        code.finish()
    }
}
