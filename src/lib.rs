//! Generate typed data models in a dozen languages from a sample JSON
//! document and an optional JSON Schema.
//!
//! The pipeline runs in four stages:
//!
//! 1. acquire: read the sample document and the schema, or infer one;
//! 2. build: map the sample onto named [`model::Entity`] records while
//!    recording entity-to-entity references in a [`graph::DependencyGraph`];
//! 3. plan: detect reference cycles, break one edge per cycle and fix a
//!    dependencies-first emission order ([`emit::EmissionPlan`]);
//! 4. render: hand the finished plan to one [`emit::TargetEmitter`] per
//!    requested language.
pub mod backends;
pub mod cli;
pub mod emit;
pub mod error;
pub mod graph;
pub mod model;
pub mod naming;
pub mod path_de;
pub mod schema;

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, debug_span, info};

pub use backends::Target;
pub use emit::{EmissionPlan, EmitOptions, Rendered};
pub use error::{AcquisitionError, Error, Result};

use schema::Schema;

// ------------------------------- Config ---------------------------------- //

/// Options of one generator run, independent of how they were collected.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub input_file: PathBuf,
    pub schema_file: Option<PathBuf>,
    /// Required unless `dry_run`.
    pub output_file: Option<PathBuf>,
    pub targets: Vec<Target>,
    pub generate_docs: bool,
    pub generate_validation: bool,
    pub indent_size: usize,
    pub verbose: bool,
    pub dry_run: bool,
    pub root_name: String,
    /// JSON pointer into the input selecting the document to model.
    pub pointer: Option<String>,
}

impl Config {
    pub fn new(input_file: impl Into<PathBuf>) -> Self {
        Self {
            input_file: input_file.into(),
            schema_file: None,
            output_file: None,
            targets: vec![Target::Rust],
            generate_docs: false,
            generate_validation: false,
            indent_size: 4,
            verbose: false,
            dry_run: false,
            root_name: "Root".to_string(),
            pointer: None,
        }
    }

    pub fn emit_options(&self) -> EmitOptions {
        let module = self
            .output_file
            .as_deref()
            .and_then(Path::file_stem)
            .map(|s| naming::convert(&s.to_string_lossy(), naming::Case::Snake))
            .unwrap_or_else(|| "model".to_string());
        EmitOptions {
            indent_size: self.indent_size,
            generate_docs: self.generate_docs,
            generate_validation: self.generate_validation,
            module,
        }
    }

    /// Source and test file paths for `target`.
    ///
    /// A lone target keeps an output path that already has an extension;
    /// otherwise the backend's extension is appended so that several targets
    /// never collide.
    pub fn output_paths(&self, target: Target) -> (PathBuf, PathBuf) {
        let base = self.output_file.clone().unwrap_or_else(|| PathBuf::from("model"));
        let source = if self.targets.len() == 1 && base.extension().is_some() {
            base
        } else {
            let mut name = base.clone().into_os_string();
            name.push(".");
            name.push(target.extension());
            PathBuf::from(name)
        };
        let stem = source.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let ext = source.extension().map(|s| s.to_string_lossy().into_owned());
        let test_name = match ext {
            Some(ext) => format!("{stem}_test.{ext}"),
            None => format!("{stem}_test"),
        };
        let tests = source.with_file_name(test_name);
        (source, tests)
    }
}

// ------------------------------ Pipeline --------------------------------- //

/// Sample document (after pointer selection) and the schema to pair it with.
pub fn acquire(config: &Config) -> Result<(Value, Schema)> {
    let _span = debug_span!("acquire", input = %config.input_file.display()).entered();
    let document = schema::read_document(&config.input_file)?;
    let data = match config.pointer.as_deref() {
        Some(pointer) => schema::select(document, pointer)?,
        None => document,
    };
    let schema = match config.schema_file.as_deref() {
        Some(path) => {
            debug!(schema = %path.display(), "using explicit schema");
            schema::read_schema(path)?
        }
        None => Schema::inferred(&data),
    };
    Ok((data, schema))
}

/// Build the model and resolve its cycles.
pub fn plan(data: &Value, schema: &Schema, root_name: &str) -> Result<EmissionPlan> {
    let mut graph = graph::DependencyGraph::new();
    let model = model::build(data, schema, root_name, &mut graph)?;
    if !model.mismatches.is_empty() {
        info!(count = model.mismatches.len(), "schema disagreed with the sample data; the data won");
    }
    EmissionPlan::prepare(model, graph)
}

/// Render every target over the same plan, one task per backend. The result
/// is in `targets` order.
pub fn render_all(plan: &EmissionPlan, targets: &[Target], options: &EmitOptions) -> Vec<Rendered> {
    targets
        .par_iter()
        .map(|target| backends::render(*target, plan, options))
        .collect()
}

/// One file pair produced (or, on a dry run, that would be produced).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub target: Target,
    pub source_path: PathBuf,
    pub test_path: PathBuf,
    pub rendered: Rendered,
}

#[derive(Debug)]
pub struct Report {
    pub plan: EmissionPlan,
    pub artifacts: Vec<Artifact>,
    /// False on a dry run.
    pub written: bool,
}

/// Run the whole pipeline for `config`.
pub fn run(config: &Config) -> Result<Report> {
    let (data, schema) = acquire(config)?;
    let plan = plan(&data, &schema, &config.root_name)?;
    info!(
        entities = plan.model.entities.len(),
        cycles = plan.cycles.len(),
        deferred = plan.deferred_count(),
        "model ready"
    );

    let options = config.emit_options();
    let artifacts: Vec<Artifact> = render_all(&plan, &config.targets, &options)
        .into_iter()
        .map(|rendered| {
            let (source_path, test_path) = config.output_paths(rendered.target);
            Artifact { target: rendered.target, source_path, test_path, rendered }
        })
        .collect();

    if config.dry_run {
        for artifact in &artifacts {
            info!(language = %artifact.target, path = %artifact.source_path.display(), "dry run: not written");
        }
    } else {
        for artifact in &artifacts {
            write_file(&artifact.source_path, &artifact.rendered.source)?;
            write_file(&artifact.test_path, &artifact.rendered.tests)?;
            info!(language = %artifact.target, path = %artifact.source_path.display(), "written");
        }
    }
    Ok(Report { plan, artifacts, written: !config.dry_run })
}

pub(crate) fn write_file(path: &Path, contents: &str) -> Result<()> {
    let to_error = |source| Error::Write { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(to_error)?;
    }
    std::fs::write(path, contents).map_err(to_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(output: &str, targets: &[Target]) -> Config {
        Config {
            output_file: Some(PathBuf::from(output)),
            targets: targets.to_vec(),
            ..Config::new("in.json")
        }
    }

    #[test]
    fn single_target_keeps_the_given_extension() {
        let cfg = config("out/person.rs", &[Target::Rust]);
        let (source, tests) = cfg.output_paths(Target::Rust);
        assert_eq!(source, PathBuf::from("out/person.rs"));
        assert_eq!(tests, PathBuf::from("out/person_test.rs"));
    }

    #[test]
    fn extension_is_appended_when_missing_or_ambiguous() {
        let cfg = config("out/person", &[Target::Go]);
        assert_eq!(cfg.output_paths(Target::Go).0, PathBuf::from("out/person.go"));

        let cfg = config("out/person.model", &[Target::Go, Target::Python]);
        let (source, tests) = cfg.output_paths(Target::Python);
        assert_eq!(source, PathBuf::from("out/person.model.py"));
        assert_eq!(tests, PathBuf::from("out/person.model_test.py"));
    }

    #[test]
    fn module_comes_from_the_output_stem() {
        let cfg = config("gen/UserProfile.ts", &[Target::TypeScript]);
        assert_eq!(cfg.emit_options().module, "user_profile");
        assert_eq!(Config::new("x.json").emit_options().module, "model");
    }

    #[test]
    fn plan_of_the_nested_example() {
        let data = serde_json::json!({"id": 1, "tags": ["a", "b"], "address": {"city": "X"}});
        let plan = plan(&data, &Schema::inferred(&data), "Root").unwrap();
        assert_eq!(plan.resolution.order, ["Root_address", "Root"]);
        assert!(plan.cycles.is_empty());
        assert_eq!(plan.deferred_count(), 0);
    }
}
