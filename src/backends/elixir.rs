//! Elixir: one struct module per entity, nested under the module namespace
//! and encoded with Jason; ExUnit round-trip test.
use std::collections::BTreeSet;

use serde_json::Value;

use super::Target;
use crate::emit::{EmitContext, TargetEmitter, TypeRules};
use crate::model::Entity;
use crate::naming::{self, Case, Escape};
use crate::schema::{EnumDef, SchemaNode};

pub struct Elixir;

static RULES: TypeRules = TypeRules {
    null: "nil",
    boolean: "boolean()",
    integer: "integer()",
    float: "float()",
    string: "String.t()",
    any: "term()",
    array: "[$T]",
    deferred: "$T | nil",
    field_case: Case::Snake,
    keywords: &[
        "after", "and", "catch", "do", "else", "end", "false", "fn", "in", "nil", "not", "or",
        "rescue", "true", "when",
    ],
    escape: Escape::Suffix("_"),
};

/// `#{` would start an interpolation inside a double-quoted string.
fn string_literal(s: &str) -> String {
    naming::quoted(s).replace("#{", "\\#{")
}

/// Type names a node mentions, looking through arrays.
fn mentioned_types(node: &SchemaNode, out: &mut BTreeSet<String>) {
    match node {
        SchemaNode::Ref(name) => {
            out.insert(naming::type_ident(name));
        }
        SchemaNode::Enum(def) => {
            out.insert(naming::type_ident(&def.name));
        }
        SchemaNode::Array(item) => mentioned_types(item, out),
        _ => {}
    }
}

impl Elixir {
    fn module_name(&self, name: &str, cx: &EmitContext) -> String {
        format!("{}.{}", cx.module_type(), self.type_name(name))
    }
}

impl TargetEmitter for Elixir {
    fn target(&self) -> Target {
        Target::Elixir
    }

    fn rules(&self) -> &'static TypeRules {
        &RULES
    }

    /// Sibling modules are aliased at the top of each entity module.
    fn entity_type(&self, name: &str) -> String {
        format!("{}.t()", self.type_name(name))
    }

    fn enum_type(&self, def: &EnumDef) -> String {
        format!("{}.t()", self.type_name(&def.name))
    }

    fn emit_header(&self, _cx: &EmitContext) -> String {
        "# Generated by json-modelgen. Do not edit.\n\n".to_string()
    }

    fn emit_enum(&self, def: &EnumDef, cx: &EmitContext) -> String {
        let atoms: Vec<_> = def.values.iter().map(|v| format!(":{}", string_literal(v))).collect();
        let values: Vec<_> = def.values.iter().map(|v| string_literal(v)).collect();
        let mut code = cx.code();
        code.line(0, format!("defmodule {} do", self.module_name(&def.name, cx)))
            .line(1, format!("@type t :: {}", atoms.join(" | ")))
            .blank()
            .line(1, format!("@values [{}]", values.join(", ")))
            .blank()
            .line(1, "def values, do: @values")
            .line(0, "end")
            .blank();
        code.finish()
    }

    fn emit_entity(&self, entity: &Entity, deferred: &BTreeSet<String>, cx: &EmitContext) -> String {
        let idents = self.field_idents(entity);
        let mut code = cx.code();
        code.line(0, format!("defmodule {} do", self.module_name(&entity.name, cx)));
        match cx.entity_doc(entity) {
            Some(doc) => code.line(1, format!("@moduledoc {}", string_literal(&doc))),
            None => code.line(1, "@moduledoc false"),
        };
        code.blank();

        let mut aliases = BTreeSet::new();
        for field in &entity.fields {
            mentioned_types(&field.node, &mut aliases);
        }
        aliases.remove(&self.type_name(&entity.name));
        if !aliases.is_empty() {
            let list: Vec<_> = aliases.into_iter().collect();
            code.line(1, format!("alias {}.{{{}}}", cx.module_type(), list.join(", ")))
                .blank();
        }

        let pairs: Vec<_> = entity
            .fields
            .iter()
            .zip(&idents)
            .map(|(f, ident)| format!("{ident}: {}", string_literal(&f.name)))
            .collect();
        code.line(1, format!("@fields [{}]", pairs.join(", ")))
            .blank()
            .line(1, "defstruct Keyword.keys(@fields)")
            .blank();

        if entity.fields.is_empty() {
            code.line(1, "@type t :: %__MODULE__{}");
        } else {
            code.line(1, "@type t :: %__MODULE__{");
            let last = entity.fields.len() - 1;
            for (i, (field, ident)) in entity.fields.iter().zip(&idents).enumerate() {
                if let Some(doc) = cx.doc(field) {
                    code.line(2, format!("# {doc}"));
                }
                let comma = if i == last { "" } else { "," };
                code.line(2, format!("{ident}: {}{comma}", self.field_type(field, deferred)));
            }
            code.line(1, "}");
        }

        code.blank()
            .line(1, "def from_map(map) when is_map(map) do")
            .line(2, "struct(__MODULE__, for({field, key} <- @fields, do: {field, Map.get(map, key)}))")
            .line(1, "end")
            .blank()
            .line(1, "def to_map(%__MODULE__{} = value) do")
            .line(2, "Map.new(@fields, fn {field, key} -> {key, Map.get(value, field)} end)")
            .line(1, "end");
        if cx.validation() {
            code.blank().line(1, "def valid?(%__MODULE__{}), do: true");
        }
        code.blank()
            .line(1, "defimpl Jason.Encoder do")
            .line(2, "def encode(value, opts), do: Jason.Encode.map(@for.to_map(value), opts)")
            .line(1, "end")
            .line(0, "end")
            .blank();
        code.finish()
    }

    fn emit_tests(&self, root: &Entity, sample: &Value, cx: &EmitContext) -> String {
        let module = self.module_name(&root.name, cx);
        let mut code = cx.code();
        code.line(0, format!("defmodule {module}Test do"))
            .line(1, "use ExUnit.Case, async: true")
            .blank()
            .line(1, format!("test {} do", string_literal(&format!("{} round-trips through JSON", root.name))))
            .line(2, format!("sample = {}", string_literal(&sample.to_string())))
            .line(2, "decoded = Jason.decode!(sample)")
            .line(2, format!("value = {module}.from_map(decoded)"))
            .line(2, "assert Jason.decode!(Jason.encode!(value)) == decoded");
        if cx.validation() {
            code.line(2, format!("assert {module}.valid?(value)"));
        }
        code.line(1, "end").line(0, "end");
        code.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::tests::render_person;

    #[test]
    fn renders_struct_modules() {
        let out = render_person(Target::Elixir);
        assert!(out.source.contains("defmodule Model.Root do\n    @moduledoc \"A person record\""));
        assert!(out.source.contains("    alias Model.{Person, Root_address, Status}"));
        assert!(out.source.contains("defmodule Model.Status do\n    @type t :: :\"active\" | :\"inactive\""));
        assert!(out.source.contains("first_name: \"first-name\""));
        assert!(out.source.contains("        first_name: String.t(),"));
        assert!(out.source.contains("        # Unique id\n        id: integer(),"));
        assert!(out.source.contains("        best_friend: Person.t() | nil"));
        assert!(out.source.contains("        status: Status.t(),"));
        assert!(out.tests.contains("value = Model.Root.from_map(decoded)"));
    }

    #[test]
    fn self_references_need_no_alias() {
        let out = render_person(Target::Elixir);
        let person = out.source.split("defmodule Model.Person do").nth(1).unwrap();
        let person = person.split("\nend\n").next().unwrap();
        assert!(!person.contains("alias"));
    }

    #[test]
    fn interpolation_is_escaped() {
        assert_eq!(string_literal("#{x}"), "\"\\#{x}\"");
    }
}
