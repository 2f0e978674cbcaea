//! CLI command implementations

pub mod run;
pub mod serve;
pub mod validate;

use anyhow::Context;
use dataflow_types::PipelineSpec;
use std::path::Path;

/// Read and parse a pipeline specification file
pub fn load_spec(path: &Path) -> anyhow::Result<PipelineSpec> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    PipelineSpec::from_json(&raw).with_context(|| format!("invalid specification {}", path.display()))
}
