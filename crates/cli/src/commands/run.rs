//! `run` - execute a specification to completion

use super::load_spec;
use colored::Colorize;
use processor::{JobEngine, JobReport};
use std::path::Path;
use std::time::Instant;

pub async fn execute(engine: &JobEngine, spec_path: &Path, json: bool) -> anyhow::Result<()> {
    let spec = load_spec(spec_path)?;
    let start = Instant::now();
    let report = engine.run(&spec).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, start.elapsed().as_millis());
    }
    Ok(())
}

fn print_report(report: &JobReport, elapsed_ms: u128) {
    eprintln!("{} {}", "✓".green(), report.name.bold());
    eprintln!("  Job ID:   {}", report.job_id.to_string().dimmed());
    eprintln!("  Read:     {}", report.events_read);
    eprintln!(
        "  Emitted:  {} ({} on flush)",
        report.events_emitted, report.events_flushed
    );
    if report.events_skipped > 0 {
        eprintln!("  Skipped:  {}", report.events_skipped.to_string().yellow());
    }
    eprintln!("  Written:  {}", report.events_written.to_string().green());
    eprintln!("  Elapsed:  {}", format!("{}ms", elapsed_ms).dimmed());
}
