//! Command line: generate → source + test files, inspect → model as JSON
use std::path::PathBuf;
use clap::{Parser, Subcommand, Args};

use crate::error::{Error, Result};
use crate::{Config, Target};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate typed data models from a sample JSON document and an optional JSON Schema
#[derive(Parser, Debug)]
#[command(name = "json-modelgen", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// render source and test files for one or more target languages
    Generate(GenerateOut),
    /// print the model, dependency graph and emission order as JSON
    Inspect(InspectOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// sample JSON document
    #[arg(long, short)]
    input: PathBuf,

    /// JSON Schema document supplying enums, `$ref` names and descriptions
    #[arg(long, short)]
    schema: Option<PathBuf>,

    /// JSON Pointer selecting the sub-document to model (e.g. /data/items/0)
    #[arg(long)]
    pointer: Option<String>,

    /// name of the root entity
    #[arg(long, default_value = "Root")]
    root_name: String,

    /// log pipeline stages to stderr
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

#[derive(clap::Parser, Debug)]
struct GenerateOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output file; the test file is written next to it as `<stem>_test.<ext>`
    #[arg(short, long, required_unless_present = "dry_run")]
    output: Option<PathBuf>,

    /// target languages, repeatable or comma-separated (cpp, csharp, java, python, go,
    /// typescript, rust, swift, dart, kotlin, elixir, scala)
    #[arg(short, long = "language", default_value = "rust")]
    languages: Vec<String>,

    /// render schema descriptions as doc comments
    #[arg(long)]
    docs: bool,

    /// add a stub validity check to every entity
    #[arg(long)]
    validation: bool,

    /// spaces per indentation level
    #[arg(long, default_value_t = 4)]
    indent: usize,

    /// run every stage but write nothing
    #[arg(long)]
    dry_run: bool,
}

#[derive(clap::Parser, Debug)]
struct InspectOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn config(&self) -> Config {
        Config {
            schema_file: self.schema.clone(),
            verbose: self.verbose,
            root_name: self.root_name.clone(),
            pointer: self.pointer.clone(),
            ..Config::new(&self.input)
        }
    }
}

impl GenerateOut {
    fn config(&self) -> Result<Config> {
        let mut targets = Vec::<Target>::new();
        for list in &self.languages {
            for target in Target::parse_list(list)? {
                if !targets.contains(&target) {
                    targets.push(target);
                }
            }
        }
        if targets.is_empty() {
            return Err(Error::UnsupportedTarget(self.languages.join(",")));
        }
        Ok(Config {
            output_file: self.output.clone(),
            targets,
            generate_docs: self.docs,
            generate_validation: self.validation,
            indent_size: self.indent,
            dry_run: self.dry_run,
            ..self.input_settings.config()
        })
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn verbose(&self) -> bool {
        match &self.cmd {
            Command::Generate(target) => target.input_settings.verbose,
            Command::Inspect(target) => target.input_settings.verbose,
        }
    }

    /// The run configuration `generate` would use; `None` for `inspect`.
    pub fn config(&self) -> Result<Option<Config>> {
        match &self.cmd {
            Command::Generate(target) => target.config().map(Some),
            Command::Inspect(_) => Ok(None),
        }
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Generate(target) => {
                let config = target.config()?;
                let report = crate::run(&config)?;
                for artifact in &report.artifacts {
                    let verb = if report.written { "wrote" } else { "would write" };
                    eprintln!("{verb} {}", artifact.source_path.display());
                    eprintln!("{verb} {}", artifact.test_path.display());
                }
                Ok(())
            }
            Command::Inspect(target) => {
                let config = target.input_settings.config();
                let (data, schema) = crate::acquire(&config)?;
                let plan = crate::plan(&data, &schema, &config.root_name)?;
                let json = serde_json::to_string_pretty(&plan).map_err(Error::Report)?;
                match target.out.as_ref() {
                    Some(out) => crate::write_file(out, &json)?,
                    None => println!("{json}"),
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CommandLineInterface {
        CommandLineInterface::try_parse_from(args).unwrap()
    }

    #[test]
    fn generate_collects_a_config() {
        let cli = parse(&[
            "json-modelgen", "generate", "-i", "in.json", "-s", "in.schema.json", "-o", "out/model",
            "-l", "rust,ts", "-l", "go", "-l", "rs", "--docs", "--indent", "2", "--pointer", "/data",
        ]);
        let config = cli.config().unwrap().unwrap();
        assert_eq!(config.input_file, PathBuf::from("in.json"));
        assert_eq!(config.schema_file, Some(PathBuf::from("in.schema.json")));
        assert_eq!(config.targets, [Target::Rust, Target::TypeScript, Target::Go]);
        assert!(config.generate_docs);
        assert!(!config.generate_validation);
        assert_eq!(config.indent_size, 2);
        assert_eq!(config.pointer.as_deref(), Some("/data"));
        assert_eq!(config.root_name, "Root");
    }

    #[test]
    fn output_is_optional_only_for_dry_runs() {
        assert!(CommandLineInterface::try_parse_from(["json-modelgen", "generate", "-i", "a.json"]).is_err());
        let cli = parse(&["json-modelgen", "generate", "-i", "a.json", "--dry-run"]);
        let config = cli.config().unwrap().unwrap();
        assert!(config.dry_run);
        assert_eq!(config.targets, [Target::Rust]);
    }

    #[test]
    fn unknown_language_is_a_library_error() {
        let cli = parse(&["json-modelgen", "generate", "-i", "a.json", "-o", "m", "-l", "cobol"]);
        assert!(cli.config().unwrap_err().is_unsupported_target());
    }

    #[test]
    fn inspect_has_no_generate_config() {
        let cli = parse(&["json-modelgen", "inspect", "-i", "a.json", "--verbose"]);
        assert!(cli.verbose());
        assert!(cli.config().unwrap().is_none());
    }
}
