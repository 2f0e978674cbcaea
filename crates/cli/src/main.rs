//! Dataflow CLI
//!
//! Runs pipeline specifications locally, validates them, or serves the HTTP
//! job submission endpoint.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use dataflow_config::EngineConfig;
use processor::{JobConfig, JobEngine};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "dataflow",
    version,
    about = "Declarative stream processing: sources, windowed operators and sinks"
)]
struct Cli {
    /// Configuration file (YAML); DATAFLOW_* environment variables override it
    #[arg(short, long, global = true, value_name = "FILE", env = "DATAFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a pipeline specification to completion
    Run {
        /// Path to the JSON pipeline specification
        spec: PathBuf,

        /// Print the job report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build a pipeline specification without running it
    Validate {
        /// Path to the JSON pipeline specification
        spec: PathBuf,
    },

    /// Serve the HTTP job submission endpoint
    Serve {
        /// Bind host (overrides configuration)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides configuration)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = EngineConfig::load(cli.config.clone())?;
    if cli.json_logs {
        config.observability.json_logs = true;
    }
    config.validate()?;

    init_tracing(&config, cli.verbose);

    let engine = build_engine(&config);

    match cli.command {
        Commands::Run { spec, json } => commands::run::execute(&engine, &spec, json).await,
        Commands::Validate { spec } => commands::validate::execute(&engine, &spec),
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            commands::serve::execute(engine, &config).await
        }
    }
}

fn build_engine(config: &EngineConfig) -> JobEngine {
    JobEngine::new(JobConfig {
        channel_capacity: config.engine.channel_capacity,
        max_nesting_depth: config.engine.max_nesting_depth,
    })
}

/// Initialize tracing/logging
///
/// `RUST_LOG` wins over the configured level. Logs go to stderr so a stdout
/// sink stays machine-readable.
fn init_tracing(config: &EngineConfig, verbose: bool) {
    let default_level = if verbose {
        "debug"
    } else {
        config.observability.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
