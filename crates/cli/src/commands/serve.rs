//! `serve` - run the HTTP job submission endpoint

use anyhow::Context;
use colored::Colorize;
use dataflow_api_rest::AppState;
use dataflow_config::EngineConfig;
use processor::JobEngine;
use std::net::SocketAddr;

pub async fn execute(engine: JobEngine, config: &EngineConfig) -> anyhow::Result<()> {
    let bind = config.server.bind_address();
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address {}", bind))?;

    eprintln!(
        "{} listening on {}",
        "dataflow".bold().cyan(),
        format!("http://{}", addr).green()
    );
    let state = AppState::new(engine).with_job_history(config.server.max_job_history);
    dataflow_api_rest::serve(addr, state)
        .await
        .context("server failed")
}
