//! C++17: plain structs over nlohmann::json, GoogleTest round-trip test.
//!
//! Serialization functions go in the footer, after every struct is complete.
//! All of them are declared before any is defined so a deferred edge can
//! call back into a type that is defined later.
use std::collections::BTreeSet;

use serde_json::Value;

use super::Target;
use crate::emit::{EmitContext, TargetEmitter, TypeRules};
use crate::model::{Entity, Field};
use crate::naming::{self, Case, Escape};
use crate::schema::{EnumDef, SchemaNode};

pub struct Cpp;

static RULES: TypeRules = TypeRules {
    null: "nlohmann::json",
    boolean: "bool",
    integer: "int64_t",
    float: "double",
    string: "std::string",
    any: "nlohmann::json",
    array: "std::vector<$T>",
    deferred: "std::shared_ptr<$T>",
    field_case: Case::Preserve,
    keywords: &[
        "alignas", "alignof", "and", "asm", "auto", "bool", "break", "case", "catch", "char",
        "class", "const", "constexpr", "continue", "decltype", "default", "delete", "do", "double",
        "else", "enum", "explicit", "export", "extern", "false", "float", "for", "friend", "goto",
        "if", "inline", "int", "long", "mutable", "namespace", "new", "noexcept", "not", "nullptr",
        "operator", "or", "private", "protected", "public", "register", "return", "short",
        "signed", "sizeof", "static", "struct", "switch", "template", "this", "throw", "true",
        "try", "typedef", "typename", "union", "unsigned", "using", "virtual", "void", "volatile",
        "while", "xor",
    ],
    escape: Escape::Suffix("_"),
};

fn namespace(cx: &EmitContext) -> String {
    naming::convert(cx.module(), Case::Snake)
}

/// Direct reference held through a `shared_ptr`.
fn is_indirect(field: &Field, deferred: &BTreeSet<String>) -> bool {
    deferred.contains(&field.name) && matches!(field.node, SchemaNode::Ref(_))
}

impl Cpp {
    fn emit_serializers(&self, cx: &EmitContext) -> String {
        let mut code = cx.code();
        for entity in cx.plan.ordered_entities() {
            let name = self.type_name(&entity.name);
            code.line(0, format!("void to_json(nlohmann::json& j, const {name}& v);"))
                .line(0, format!("void from_json(const nlohmann::json& j, {name}& v);"));
        }
        code.blank();

        for entity in cx.plan.ordered_entities() {
            let name = self.type_name(&entity.name);
            let deferred = cx.plan.deferred_for(&entity.name);
            let fields: Vec<_> = entity.fields.iter().zip(self.field_idents(entity)).collect();

            code.line(0, format!("inline void to_json(nlohmann::json& j, const {name}& v) {{"))
                .line(1, "j = nlohmann::json::object();");
            for (field, ident) in &fields {
                let key = naming::quoted(&field.name);
                if is_indirect(field, deferred) {
                    code.line(1, format!("j[{key}] = v.{ident} ? nlohmann::json(*v.{ident}) : nlohmann::json(nullptr);"));
                } else {
                    code.line(1, format!("j[{key}] = v.{ident};"));
                }
            }
            code.line(0, "}").blank();

            code.line(0, format!("inline void from_json(const nlohmann::json& j, {name}& v) {{"));
            for (field, ident) in &fields {
                let key = naming::quoted(&field.name);
                if is_indirect(field, deferred) {
                    let target = self.render_type(&field.node);
                    code.line(1, format!("if (auto it = j.find({key}); it != j.end() && !it->is_null()) {{"))
                        .line(2, format!("v.{ident} = std::make_shared<{target}>(it->get<{target}>());"))
                        .line(1, "}");
                } else {
                    code.line(1, format!("j.at({key}).get_to(v.{ident});"));
                }
            }
            code.line(0, "}").blank();
        }
        code.finish()
    }
}

impl TargetEmitter for Cpp {
    fn target(&self) -> Target {
        Target::Cpp
    }

    fn rules(&self) -> &'static TypeRules {
        &RULES
    }

    fn emit_header(&self, cx: &EmitContext) -> String {
        let mut code = cx.code();
        code.line(0, "// Generated by json-modelgen. Do not edit.")
            .line(0, "#pragma once")
            .blank()
            .line(0, "#include <cstdint>")
            .line(0, "#include <memory>")
            .line(0, "#include <string>")
            .line(0, "#include <vector>")
            .blank()
            .line(0, "#include <nlohmann/json.hpp>")
            .blank()
            .line(0, format!("namespace {} {{", namespace(cx)))
            .blank();

        let forward: Vec<_> = cx
            .plan
            .ordered_entities()
            .filter(|e| cx.is_forward_referenced(&e.name))
            .collect();
        for entity in &forward {
            code.line(0, format!("struct {};", self.type_name(&entity.name)));
        }
        if !forward.is_empty() {
            code.blank();
        }
        code.finish()
    }

    fn emit_enum(&self, def: &EnumDef, cx: &EmitContext) -> String {
        let name = self.type_name(&def.name);
        let members = naming::unique(def.values.iter().map(|v| naming::convert(v, Case::Pascal)));
        let mut code = cx.code();
        code.line(0, format!("enum class {name} {{"));
        for member in &members {
            code.line(1, format!("{member},"));
        }
        code.line(0, "};").blank().line(0, format!("NLOHMANN_JSON_SERIALIZE_ENUM({name}, {{"));
        for (value, member) in def.values.iter().zip(&members) {
            code.line(1, format!("{{{name}::{member}, {}}},", naming::quoted(value)));
        }
        code.line(0, "})").blank();
        code.finish()
    }

    fn emit_entity(&self, entity: &Entity, deferred: &BTreeSet<String>, cx: &EmitContext) -> String {
        let name = self.type_name(&entity.name);
        let mut code = cx.code();
        if let Some(doc) = cx.entity_doc(entity) {
            code.line(0, format!("/// {doc}"));
        }
        code.line(0, format!("struct {name} {{"));
        for (field, ident) in entity.fields.iter().zip(self.field_idents(entity)) {
            if let Some(doc) = cx.doc(field) {
                code.line(1, format!("/// {doc}"));
            }
            code.line(1, format!("{} {ident}{{}};", self.field_type(field, deferred)));
        }
        if cx.validation() {
            code.blank().line(1, "bool is_valid() const { return true; }");
        }
        code.line(0, "};").blank();
        code.finish()
    }

    fn emit_footer(&self, cx: &EmitContext) -> String {
        let mut out = self.emit_serializers(cx);
        out.push_str(&format!("}}  // namespace {}\n", namespace(cx)));
        out
    }

    fn emit_tests(&self, root: &Entity, sample: &Value, cx: &EmitContext) -> String {
        let name = self.type_name(&root.name);
        let mut code = cx.code();
        code.line(0, "#include <gtest/gtest.h>")
            .blank()
            .line(0, format!("#include \"{}.hpp\"", cx.module()))
            .blank()
            .line(0, format!("TEST({name}Test, RoundTrips) {{"))
            .line(1, format!("const auto sample = nlohmann::json::parse(R\"json({sample})json\");"))
            .line(1, format!("const auto value = sample.get<{}::{name}>();", namespace(cx)))
            .line(1, "EXPECT_EQ(nlohmann::json(value), sample);");
        if cx.validation() {
            code.line(1, "EXPECT_TRUE(value.is_valid());");
        }
        code.line(0, "}");
        code.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::tests::render_person;

    #[test]
    fn renders_structs_and_serializers() {
        let out = render_person(Target::Cpp);
        assert!(out.source.contains("namespace model {\n\nstruct Person;\n"));
        assert!(out.source.contains("    std::string first_name{};"));
        assert!(out.source.contains("    std::string type{};"));
        assert!(out.source.contains("    /// Unique id\n    int64_t id{};"));
        assert!(out.source.contains("    std::shared_ptr<Person> best_friend{};"));
        assert!(out.source.contains("    {Status::Active, \"active\"},"));
        assert!(out.source.contains("void to_json(nlohmann::json& j, const Root& v);"));
        assert!(out.source.contains("    j[\"first-name\"] = v.first_name;"));
        assert!(out.source.contains("v.best_friend = std::make_shared<Person>(it->get<Person>());"));
        assert!(out.source.ends_with("}  // namespace model\n"));
        assert!(out.tests.contains("sample.get<model::Root>()"));
    }

    #[test]
    fn struct_precedes_its_users() {
        let out = render_person(Target::Cpp);
        let person = out.source.find("struct Person {").unwrap();
        let root = out.source.find("struct Root {").unwrap();
        assert!(person < root);
    }
}
