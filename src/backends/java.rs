//! Java: Jackson-annotated static nested classes inside one outer class
//! named after the module, JUnit 5 round-trip test.
use std::collections::BTreeSet;

use serde_json::Value;

use super::Target;
use crate::emit::{EmitContext, TargetEmitter, TypeRules};
use crate::model::Entity;
use crate::naming::{self, Case, Escape};
use crate::schema::EnumDef;

pub struct Java;

static RULES: TypeRules = TypeRules {
    null: "Object",
    boolean: "Boolean",
    integer: "Long",
    float: "Double",
    string: "String",
    any: "Object",
    array: "List<$T>",
    deferred: "$T",
    field_case: Case::Camel,
    keywords: &[
        "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
        "continue", "default", "do", "double", "else", "enum", "extends", "false", "final",
        "finally", "float", "for", "goto", "if", "implements", "import", "instanceof", "int",
        "interface", "long", "native", "new", "null", "package", "private", "protected", "public",
        "record", "return", "short", "static", "strictfp", "super", "switch", "synchronized",
        "this", "throw", "throws", "transient", "true", "try", "var", "void", "volatile", "while",
        "yield",
    ],
    escape: Escape::Suffix("_"),
};

impl TargetEmitter for Java {
    fn target(&self) -> Target {
        Target::Java
    }

    fn rules(&self) -> &'static TypeRules {
        &RULES
    }

    fn emit_header(&self, cx: &EmitContext) -> String {
        let mut code = cx.code();
        code.line(0, "// Generated by json-modelgen. Do not edit.")
            .line(0, "import java.util.List;")
            .blank()
            .line(0, "import com.fasterxml.jackson.annotation.JsonProperty;")
            .blank()
            .line(0, format!("public final class {} {{", cx.module_type()))
            .line(1, format!("private {}() {{}}", cx.module_type()))
            .blank();
        code.finish()
    }

    fn emit_enum(&self, def: &EnumDef, cx: &EmitContext) -> String {
        let constants = naming::unique(def.values.iter().map(|v| {
            naming::convert(v, Case::Snake).to_ascii_uppercase()
        }));
        let mut code = cx.code();
        code.line(1, format!("public enum {} {{", self.type_name(&def.name)));
        for (value, constant) in def.values.iter().zip(&constants) {
            code.line(2, format!("@JsonProperty({})", naming::quoted(value)))
                .line(2, format!("{constant},"));
        }
        code.line(1, "}").blank();
        code.finish()
    }

    fn emit_entity(&self, entity: &Entity, deferred: &BTreeSet<String>, cx: &EmitContext) -> String {
        let name = self.type_name(&entity.name);
        let mut code = cx.code();
        if let Some(doc) = cx.entity_doc(entity) {
            code.line(1, format!("/** {doc} */"));
        }
        code.line(1, format!("public static class {name} {{"));
        for (field, ident) in entity.fields.iter().zip(self.field_idents(entity)) {
            if let Some(doc) = cx.doc(field) {
                code.line(2, format!("/** {doc} */"));
            }
            code.line(2, format!("@JsonProperty({})", naming::quoted(&field.name)))
                .line(2, format!("public {} {ident};", self.field_type(field, deferred)));
        }
        if cx.validation() {
            code.blank()
                .line(2, "public boolean isValid() {")
                .line(3, "return true;")
                .line(2, "}");
        }
        code.line(1, "}").blank();
        code.finish()
    }

    fn emit_footer(&self, cx: &EmitContext) -> String {
        let mut code = cx.code();
        code.line(0, "}");
        code.finish()
    }

    fn emit_tests(&self, root: &Entity, sample: &Value, cx: &EmitContext) -> String {
        let outer = cx.module_type();
        let name = format!("{outer}.{}", self.type_name(&root.name));
        let mut code = cx.code();
        code.line(0, "import static org.junit.jupiter.api.Assertions.assertEquals;")
            .blank()
            .line(0, "import com.fasterxml.jackson.databind.JsonNode;")
            .line(0, "import com.fasterxml.jackson.databind.ObjectMapper;")
            .line(0, "import org.junit.jupiter.api.Test;")
            .blank()
            .line(0, format!("class {outer}Test {{"))
            .line(1, "@Test")
            .line(1, format!("void {}RoundTrips() throws Exception {{", naming::convert(&root.name, Case::Camel)))
            .line(2, "ObjectMapper mapper = new ObjectMapper();")
            .line(2, format!("String sample = {};", naming::quoted(&sample.to_string())))
            .line(2, format!("{name} value = mapper.readValue(sample, {name}.class);"))
            .line(2, "JsonNode original = mapper.readTree(sample);")
            .line(2, "assertEquals(original, mapper.valueToTree(value));")
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
    fn nests_classes_in_the_module_class() {
        let out = render_person(Target::Java);
        assert!(out.source.contains("public final class Model {"));
        assert!(out.source.contains("        @JsonProperty(\"first-name\")\n        public String firstName;"));
        assert!(out.source.contains("        /** Unique id */\n        @JsonProperty(\"id\")\n        public Long id;"));
        assert!(out.source.contains("public Person bestFriend;"));
        assert!(out.source.contains("        ACTIVE,"));
        assert!(out.source.ends_with("    }\n\n}\n"));
        assert!(out.tests.contains("Model.Root value = mapper.readValue(sample, Model.Root.class);"));
    }
}
