//! Swift: Codable structs, XCTest round-trip test.
//!
//! Value types cannot contain themselves, so an entity holding a deferred
//! reference is emitted as a `final class` instead of a `struct`.
use std::collections::BTreeSet;

use serde_json::Value;

use super::Target;
use crate::emit::{EmitContext, TargetEmitter, TypeRules};
use crate::model::Entity;
use crate::naming::{self, Case, Escape};
use crate::schema::{EnumDef, SchemaNode};

pub struct Swift;

static RULES: TypeRules = TypeRules {
    null: "Never?",
    boolean: "Bool",
    integer: "Int",
    float: "Double",
    string: "String",
    any: "Never",
    array: "[$T]",
    deferred: "$T?",
    field_case: Case::Camel,
    keywords: &[
        "Any", "Self", "as", "associatedtype", "break", "case", "catch", "class", "continue",
        "default", "defer", "deinit", "do", "else", "enum", "extension", "fallthrough", "false",
        "fileprivate", "for", "func", "guard", "if", "import", "in", "init", "inout", "internal",
        "is", "let", "nil", "open", "operator", "private", "protocol", "public", "repeat",
        "rethrows", "return", "self", "static", "struct", "subscript", "super", "switch", "throw",
        "throws", "true", "try", "typealias", "var", "where", "while",
    ],
    escape: Escape::Wrap("`"),
};

impl TargetEmitter for Swift {
    fn target(&self) -> Target {
        Target::Swift
    }

    fn rules(&self) -> &'static TypeRules {
        &RULES
    }

    fn emit_header(&self, cx: &EmitContext) -> String {
        let mut code = cx.code();
        code.line(0, "// Generated by json-modelgen. Do not edit.")
            .line(0, "import Foundation")
            .blank();
        code.finish()
    }

    fn emit_enum(&self, def: &EnumDef, cx: &EmitContext) -> String {
        let cases = naming::unique(def.values.iter().map(|v| {
            naming::escape_keyword(naming::convert(v, Case::Camel), RULES.keywords, RULES.escape)
        }));
        let mut code = cx.code();
        code.line(0, format!("enum {}: String, Codable {{", self.type_name(&def.name)));
        for (value, case) in def.values.iter().zip(&cases) {
            code.line(1, format!("case {case} = {}", naming::quoted(value)));
        }
        code.line(0, "}").blank();
        code.finish()
    }

    fn emit_entity(&self, entity: &Entity, deferred: &BTreeSet<String>, cx: &EmitContext) -> String {
        let name = self.type_name(&entity.name);
        let idents = self.field_idents(entity);
        let indirect = entity
            .fields
            .iter()
            .any(|f| deferred.contains(&f.name) && matches!(f.node, SchemaNode::Ref(_)));

        let mut code = cx.code();
        if let Some(doc) = cx.entity_doc(entity) {
            code.line(0, format!("/// {doc}"));
        }
        let keyword = if indirect { "final class" } else { "struct" };
        code.line(0, format!("{keyword} {name}: Codable {{"));
        for (field, ident) in entity.fields.iter().zip(&idents) {
            if let Some(doc) = cx.doc(field) {
                code.line(1, format!("/// {doc}"));
            }
            code.line(1, format!("let {ident}: {}", self.field_type(field, deferred)));
        }

        if entity.fields.iter().zip(&idents).any(|(f, i)| &f.name != i) {
            code.blank().line(1, "enum CodingKeys: String, CodingKey {");
            for (field, ident) in entity.fields.iter().zip(&idents) {
                if &field.name == ident {
                    code.line(2, format!("case {ident}"));
                } else {
                    code.line(2, format!("case {ident} = {}", naming::quoted(&field.name)));
                }
            }
            code.line(1, "}");
        }
        if cx.validation() {
            code.blank()
                .line(1, "func isValid() -> Bool {")
                .line(2, "true")
                .line(1, "}");
        }
        code.line(0, "}").blank();
        code.finish()
    }

    fn emit_tests(&self, root: &Entity, sample: &Value, cx: &EmitContext) -> String {
        let name = self.type_name(&root.name);
        let mut code = cx.code();
        code.line(0, "import XCTest")
            .line(0, format!("@testable import {}", cx.module_type()))
            .blank()
            .line(0, format!("final class {name}Tests: XCTestCase {{"))
            .line(1, "func testRoundTrip() throws {")
            .line(2, format!("let sample = Data({}.utf8)", naming::quoted(&sample.to_string())))
            .line(2, format!("let value = try JSONDecoder().decode({name}.self, from: sample)"))
            .line(2, "let encoded = try JSONEncoder().encode(value)")
            .line(2, "let original = try JSONSerialization.jsonObject(with: sample) as? NSDictionary")
            .line(2, "let decoded = try JSONSerialization.jsonObject(with: encoded) as? NSDictionary")
            .line(2, "XCTAssertEqual(original, decoded)")
            .line(1, "}")
            .line(0, "}");
        code.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::tests::render_person;

    #[test]
    fn renders_codable_types() {
        let out = render_person(Target::Swift);
        assert!(out.source.contains("struct Root: Codable {"));
        assert!(out.source.contains("final class Person: Codable {"));
        assert!(out.source.contains("    let bestFriend: Person?"));
        assert!(out.source.contains("    /// Unique id\n    let id: Int"));
        assert!(out.source.contains("        case firstName = \"first-name\""));
        assert!(out.source.contains("    case active = \"active\""));
        assert!(out.tests.contains("JSONDecoder().decode(Root.self, from: sample)"));
    }
}
