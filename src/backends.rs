//! The closed set of target languages.
//!
//! Each backend is a stateless unit struct implementing
//! [`TargetEmitter`](crate::emit::TargetEmitter). Dispatch is an exhaustive
//! `match` on [`Target`], so adding a language means adding a variant and
//! the compiler points at every place that has to learn about it.
mod cpp;
mod csharp;
mod dart;
mod elixir;
mod go;
mod java;
mod kotlin;
mod python;
mod rust;
mod scala;
mod swift;
mod typescript;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::emit::{self, EmissionPlan, EmitOptions, Rendered};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Cpp,
    CSharp,
    Java,
    Python,
    Go,
    TypeScript,
    Rust,
    Swift,
    Dart,
    Kotlin,
    Elixir,
    Scala,
}

impl Target {
    pub const ALL: [Target; 12] = [
        Target::Cpp,
        Target::CSharp,
        Target::Java,
        Target::Python,
        Target::Go,
        Target::TypeScript,
        Target::Rust,
        Target::Swift,
        Target::Dart,
        Target::Kotlin,
        Target::Elixir,
        Target::Scala,
    ];

    /// Canonical command-line name.
    pub fn name(self) -> &'static str {
        match self {
            Target::Cpp => "cpp",
            Target::CSharp => "csharp",
            Target::Java => "java",
            Target::Python => "python",
            Target::Go => "go",
            Target::TypeScript => "typescript",
            Target::Rust => "rust",
            Target::Swift => "swift",
            Target::Dart => "dart",
            Target::Kotlin => "kotlin",
            Target::Elixir => "elixir",
            Target::Scala => "scala",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Target::Cpp => "hpp",
            Target::CSharp => "cs",
            Target::Java => "java",
            Target::Python => "py",
            Target::Go => "go",
            Target::TypeScript => "ts",
            Target::Rust => "rs",
            Target::Swift => "swift",
            Target::Dart => "dart",
            Target::Kotlin => "kt",
            Target::Elixir => "ex",
            Target::Scala => "scala",
        }
    }

    /// Parse a comma-separated list, keeping the first occurrence of each.
    pub fn parse_list(list: &str) -> Result<Vec<Target>> {
        let mut targets = Vec::new();
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let target = name.parse::<Target>()?;
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        Ok(targets)
    }
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let target = match s.trim().to_ascii_lowercase().as_str() {
            "cpp" | "c++" => Target::Cpp,
            "csharp" | "cs" | "c#" => Target::CSharp,
            "java" => Target::Java,
            "python" | "py" => Target::Python,
            "go" | "golang" => Target::Go,
            "typescript" | "ts" => Target::TypeScript,
            "rust" | "rs" => Target::Rust,
            "swift" => Target::Swift,
            "dart" => Target::Dart,
            "kotlin" | "kt" => Target::Kotlin,
            "elixir" | "ex" => Target::Elixir,
            "scala" => Target::Scala,
            _ => return Err(Error::UnsupportedTarget(s.to_string())),
        };
        Ok(target)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Render `plan` with the backend registered for `target`.
pub fn render(target: Target, plan: &EmissionPlan, options: &EmitOptions) -> Rendered {
    match target {
        Target::Cpp => emit::render(&cpp::Cpp, plan, options),
        Target::CSharp => emit::render(&csharp::CSharp, plan, options),
        Target::Java => emit::render(&java::Java, plan, options),
        Target::Python => emit::render(&python::Python, plan, options),
        Target::Go => emit::render(&go::Go, plan, options),
        Target::TypeScript => emit::render(&typescript::TypeScript, plan, options),
        Target::Rust => emit::render(&rust::Rust, plan, options),
        Target::Swift => emit::render(&swift::Swift, plan, options),
        Target::Dart => emit::render(&dart::Dart, plan, options),
        Target::Kotlin => emit::render(&kotlin::Kotlin, plan, options),
        Target::Elixir => emit::render(&elixir::Elixir, plan, options),
        Target::Scala => emit::render(&scala::Scala, plan, options),
    }
}
