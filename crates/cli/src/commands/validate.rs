//! `validate` - build a specification without running it

use super::load_spec;
use colored::Colorize;
use processor::JobEngine;
use std::path::Path;

pub fn execute(engine: &JobEngine, spec_path: &Path) -> anyhow::Result<()> {
    let names = describe(engine, spec_path)?;

    println!("{} {}", "✓".green(), "Specification is valid".bold());
    if names.is_empty() {
        println!("  (no operators, events pass straight through)");
    }
    for (idx, name) in names.iter().enumerate() {
        println!("  {}. {}", idx + 1, name.cyan());
    }
    Ok(())
}

/// Names of the operators the specification builds, in chain order
fn describe(engine: &JobEngine, spec_path: &Path) -> anyhow::Result<Vec<String>> {
    let spec = load_spec(spec_path)?;
    let job = engine.prepare(&spec)?;
    Ok(job
        .pipeline()
        .operator_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect())
}
