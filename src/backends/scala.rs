//! Scala 3: circe-derived case classes and string-backed enums, ScalaTest
//! round-trip test.
use std::collections::BTreeSet;

use serde_json::Value;

use super::Target;
use crate::emit::{EmitContext, TargetEmitter, TypeRules};
use crate::model::Entity;
use crate::naming::{self, Case, Escape};
use crate::schema::EnumDef;

pub struct Scala;

static RULES: TypeRules = TypeRules {
    null: "Option[Json]",
    boolean: "Boolean",
    integer: "Long",
    float: "Double",
    string: "String",
    any: "Json",
    array: "List[$T]",
    deferred: "Option[$T]",
    field_case: Case::Preserve,
    keywords: &[
        "abstract", "case", "catch", "class", "def", "do", "else", "enum", "export", "extends",
        "false", "final", "finally", "for", "given", "if", "implicit", "import", "lazy", "match",
        "new", "null", "object", "override", "package", "private", "protected", "return",
        "sealed", "super", "then", "this", "throw", "trait", "true", "try", "type", "val", "var",
        "while", "with", "yield",
    ],
    escape: Escape::Wrap("`"),
};

impl TargetEmitter for Scala {
    fn target(&self) -> Target {
        Target::Scala
    }

    fn rules(&self) -> &'static TypeRules {
        &RULES
    }

    /// Derived codecs use the parameter name as the JSON key, so names stay
    /// verbatim and are backquoted when they are not plain identifiers.
    fn field_idents(&self, entity: &Entity) -> Vec<String> {
        entity
            .fields
            .iter()
            .map(|f| {
                if naming::is_identifier(&f.name) && !RULES.keywords.contains(&f.name.as_str()) {
                    f.name.clone()
                } else {
                    format!("`{}`", f.name.replace('`', ""))
                }
            })
            .collect()
    }

    fn emit_header(&self, cx: &EmitContext) -> String {
        let mut code = cx.code();
        code.line(0, "// Generated by json-modelgen. Do not edit.")
            .line(0, "import io.circe.{Decoder, Encoder, Json}")
            .line(0, "import io.circe.generic.semiauto.{deriveDecoder, deriveEncoder}")
            .blank();
        code.finish()
    }

    fn emit_enum(&self, def: &EnumDef, cx: &EmitContext) -> String {
        let name = self.type_name(&def.name);
        let cases = naming::unique(def.values.iter().map(|v| naming::convert(v, Case::Pascal)));
        let mut code = cx.code();
        code.line(0, format!("enum {name}(val value: String) {{"));
        for (value, case) in def.values.iter().zip(&cases) {
            code.line(1, format!("case {case} extends {name}({})", naming::quoted(value)));
        }
        code.line(0, "}")
            .blank()
            .line(0, format!("object {name} {{"))
            .line(1, format!("given Encoder[{name}] = Encoder.encodeString.contramap(_.value)"))
            .line(1, format!("given Decoder[{name}] = Decoder.decodeString.emap {{ s =>"))
            .line(2, format!("{name}.values.find(_.value == s).toRight(s\"unknown {name}: $s\")"))
            .line(1, "}")
            .line(0, "}")
            .blank();
        code.finish()
    }

    fn emit_entity(&self, entity: &Entity, deferred: &BTreeSet<String>, cx: &EmitContext) -> String {
        let name = self.type_name(&entity.name);
        let idents = self.field_idents(entity);
        let mut code = cx.code();
        if let Some(doc) = cx.entity_doc(entity) {
            code.line(0, format!("/** {doc} */"));
        }
        code.line(0, format!("final case class {name}("));
        let last = entity.fields.len().saturating_sub(1);
        for (i, (field, ident)) in entity.fields.iter().zip(&idents).enumerate() {
            if let Some(doc) = cx.doc(field) {
                code.line(1, format!("/** {doc} */"));
            }
            let comma = if i == last { "" } else { "," };
            code.line(1, format!("{ident}: {}{comma}", self.field_type(field, deferred)));
        }
        code.line(0, ")")
            .blank()
            .line(0, format!("object {name} {{"))
            .line(1, format!("given Encoder[{name}] = deriveEncoder"))
            .line(1, format!("given Decoder[{name}] = deriveDecoder"));
        if cx.validation() {
            code.blank().line(1, format!("extension (value: {name}) def isValid: Boolean = true"));
        }
        code.line(0, "}").blank();
        code.finish()
    }

    fn emit_tests(&self, root: &Entity, sample: &Value, cx: &EmitContext) -> String {
        let name = self.type_name(&root.name);
        let mut code = cx.code();
        code.line(0, "import io.circe.parser.parse")
            .line(0, "import io.circe.syntax.*")
            .line(0, "import org.scalatest.flatspec.AnyFlatSpec")
            .line(0, "import org.scalatest.matchers.should.Matchers")
            .blank()
            .line(0, format!("class {name}Spec extends AnyFlatSpec with Matchers {{"))
            .line(1, format!("\"{name}\" should \"round-trip through JSON\" in {{"))
            .line(2, format!("val sample = {}", naming::quoted(&sample.to_string())))
            .line(2, "val json = parse(sample).toOption.get")
            .line(2, format!("val value = json.as[{name}].toOption.get"))
            .line(2, "value.asJson shouldBe json")
            .line(1, "}")
            .line(0, "}");
        code.finish()
    }
}
