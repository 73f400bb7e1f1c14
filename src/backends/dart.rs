//! Dart: json_serializable classes, package:test round-trip test.
use std::collections::BTreeSet;

use serde_json::Value;

use super::Target;
use crate::emit::{EmitContext, TargetEmitter, TypeRules};
use crate::model::Entity;
use crate::naming::{self, Case, Escape};
use crate::schema::{EnumDef, SchemaNode};

pub struct Dart;

static RULES: TypeRules = TypeRules {
    null: "dynamic",
    boolean: "bool",
    integer: "int",
    float: "double",
    string: "String",
    any: "dynamic",
    array: "List<$T>",
    deferred: "$T?",
    field_case: Case::Camel,
    keywords: &[
        "assert", "break", "case", "catch", "class", "const", "continue", "default", "do", "else",
        "enum", "extends", "false", "final", "finally", "for", "if", "in", "is", "new", "null",
        "rethrow", "return", "super", "switch", "this", "throw", "true", "try", "var", "void",
        "while", "with",
    ],
    escape: Escape::Suffix("_"),
};

/// Single-quoted literal; `$` would start an interpolation.
fn string_literal(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('\'', "\\'").replace('$', "\\$");
    format!("'{escaped}'")
}

impl TargetEmitter for Dart {
    fn target(&self) -> Target {
        Target::Dart
    }

    fn rules(&self) -> &'static TypeRules {
        &RULES
    }

    fn emit_header(&self, cx: &EmitContext) -> String {
        let mut code = cx.code();
        code.line(0, "// Generated by json-modelgen. Do not edit.")
            .line(0, "import 'package:json_annotation/json_annotation.dart';")
            .blank()
            .line(0, format!("part '{}.g.dart';", cx.module()))
            .blank();
        code.finish()
    }

    fn emit_enum(&self, def: &EnumDef, cx: &EmitContext) -> String {
        let values = naming::unique(def.values.iter().map(|v| {
            naming::escape_keyword(naming::convert(v, Case::Camel), RULES.keywords, RULES.escape)
        }));
        let mut code = cx.code();
        code.line(0, format!("enum {} {{", self.type_name(&def.name)));
        for (value, ident) in def.values.iter().zip(&values) {
            code.line(1, format!("@JsonValue({})", string_literal(value)))
                .line(1, format!("{ident},"));
        }
        code.line(0, "}").blank();
        code.finish()
    }

    fn emit_entity(&self, entity: &Entity, deferred: &BTreeSet<String>, cx: &EmitContext) -> String {
        let name = self.type_name(&entity.name);
        let idents = self.field_idents(entity);
        let mut code = cx.code();
        if let Some(doc) = cx.entity_doc(entity) {
            code.line(0, format!("/// {doc}"));
        }
        code.line(0, "@JsonSerializable(explicitToJson: true)")
            .line(0, format!("class {name} {{"));
        for (field, ident) in entity.fields.iter().zip(&idents) {
            if let Some(doc) = cx.doc(field) {
                code.line(1, format!("/// {doc}"));
            }
            code.line(1, format!("@JsonKey(name: {})", string_literal(&field.name)))
                .line(1, format!("final {} {ident};", self.field_type(field, deferred)))
                .blank();
        }

        code.line(1, format!("{name}({{"));
        for (field, ident) in entity.fields.iter().zip(&idents) {
            let optional = deferred.contains(&field.name) && matches!(field.node, SchemaNode::Ref(_));
            let required = if optional { "" } else { "required " };
            code.line(2, format!("{required}this.{ident},"));
        }
        code.line(1, "});")
            .blank()
            .line(1, format!("factory {name}.fromJson(Map<String, dynamic> json) => _${name}FromJson(json);"))
            .blank()
            .line(1, format!("Map<String, dynamic> toJson() => _${name}ToJson(this);"));
        if cx.validation() {
            code.blank().line(1, "bool isValid() => true;");
        }
        code.line(0, "}").blank();
        code.finish()
    }

    fn emit_tests(&self, root: &Entity, sample: &Value, cx: &EmitContext) -> String {
        let name = self.type_name(&root.name);
        let mut code = cx.code();
        code.line(0, "import 'dart:convert';")
            .blank()
            .line(0, "import 'package:test/test.dart';")
            .blank()
            .line(0, format!("import '{}.dart';", cx.module()))
            .blank()
            .line(0, "void main() {")
            .line(1, format!("test({}, () {{", string_literal(&format!("{name} round-trips through JSON"))))
            .line(2, format!("const sample = {};", string_literal(&sample.to_string())))
            .line(2, "final decoded = jsonDecode(sample) as Map<String, dynamic>;")
            .line(2, format!("final value = {name}.fromJson(decoded);"))
            .line(2, "expect(jsonDecode(jsonEncode(value.toJson())), equals(decoded));")
            .line(1, "});")
            .line(0, "}");
        code.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::tests::render_person;

    #[test]
    fn renders_json_serializable_classes() {
        let out = render_person(Target::Dart);
        assert!(out.source.contains("part 'model.g.dart';"));
        assert!(out.source.contains("    @JsonKey(name: 'first-name')\n    final String firstName;"));
        assert!(out.source.contains("    /// Unique id\n    @JsonKey(name: 'id')\n    final int id;"));
        assert!(out.source.contains("    final Person? bestFriend;"));
        assert!(out.source.contains("        this.bestFriend,"));
        assert!(out.source.contains("        required this.name,"));
        assert!(out.source.contains("factory Root.fromJson(Map<String, dynamic> json) => _$RootFromJson(json);"));
    }

    #[test]
    fn literals_escape_interpolation() {
        assert_eq!(string_literal("it's $5"), r"'it\'s \$5'");
    }
}
