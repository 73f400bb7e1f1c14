//! Renders every fixture for every target twice and checks that the output is
//! byte-identical and that no entity is emitted before a non-deferred
//! dependency.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use colored::Colorize;
use json_modelgen::{Config, EmissionPlan, EmitOptions, Target};

fn fixture_inputs(dir: &Path) -> Result<Vec<(PathBuf, Option<PathBuf>)>> {
    let pattern = dir.join("*.json");
    let pattern = pattern.to_string_lossy();
    let mut out = Vec::new();
    for entry in glob::glob(&pattern).context("invalid fixture pattern")? {
        let path = entry?;
        let name = path.to_string_lossy();
        if name.ends_with(".schema.json") {
            continue;
        }
        let schema = path.with_extension("schema.json");
        out.push((path.clone(), schema.exists().then_some(schema)));
    }
    Ok(out)
}

fn check_order(plan: &EmissionPlan) -> Result<()> {
    let position = |name: &str| plan.resolution.order.iter().position(|n| n == name);
    for entity in plan.model.entities.iter() {
        let deferred = plan.deferred_for(&entity.name);
        for (field, target) in entity.references() {
            if deferred.contains(&field.name) {
                continue;
            }
            match (position(target), position(&entity.name)) {
                (Some(dep), Some(user)) if dep < user => {}
                _ => bail!("{} is ordered before its dependency {target}", entity.name),
            }
        }
    }
    Ok(())
}

fn check_fixture(input: &Path, schema: Option<&Path>) -> Result<usize> {
    let config = Config {
        schema_file: schema.map(Path::to_path_buf),
        ..Config::new(input)
    };
    let (data, schema) = json_modelgen::acquire(&config)?;
    let plan = json_modelgen::plan(&data, &schema, &config.root_name)?;
    check_order(&plan)?;

    let options = EmitOptions { generate_docs: true, generate_validation: true, ..EmitOptions::default() };
    let first = json_modelgen::render_all(&plan, &Target::ALL, &options);
    let second = json_modelgen::render_all(&plan, &Target::ALL, &options);
    for (a, b) in first.iter().zip(&second) {
        if a != b {
            bail!("{} output differs between runs", a.target);
        }
    }
    Ok(first.len())
}

fn main() -> Result<()> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("fixtures");
    let fixtures = fixture_inputs(&root)?;
    let mut failures = 0usize;
    for (input, schema) in &fixtures {
        let label = input.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        match check_fixture(input, schema.as_deref()) {
            Ok(targets) => eprintln!("{} {label} ({targets} targets)", "✓".green()),
            Err(error) => {
                failures += 1;
                eprintln!("{} {label}: {error:#}", "✗".red());
            }
        }
    }
    if failures > 0 {
        bail!("{failures} of {} fixtures failed", fixtures.len());
    }
    eprintln!("{}", format!("all {} fixtures passed", fixtures.len()).green().bold());
    Ok(())
}
