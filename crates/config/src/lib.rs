//! Configuration management for the dataflow engine

use figment::{Figment, providers::{Format, Yaml, Env}};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// HTTP job submission server
    pub server: ServerConfig,

    /// Defaults applied to every job
    pub engine: JobDefaults,

    /// Observability settings
    pub observability: ObservabilityConfig,
}

impl EngineConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let mut figment = Figment::new();

        // Load from file if provided
        if let Some(path) = config_path {
            figment = figment.merge(Yaml::file(path));
        }

        // Override with environment variables (prefixed with DATAFLOW_)
        figment = figment.merge(Env::prefixed("DATAFLOW_").split("__"));

        figment.extract().map_err(|e| ConfigError::LoadError(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError("Invalid server port".to_string()));
        }

        if self.server.host.is_empty() {
            return Err(ConfigError::ValidationError("Server host required".to_string()));
        }

        if self.server.max_job_history == 0 {
            return Err(ConfigError::ValidationError(
                "server.max_job_history must be at least 1".to_string(),
            ));
        }

        if self.engine.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "engine.channel_capacity must be at least 1".to_string(),
            ));
        }

        if self.engine.max_nesting_depth == 0 {
            return Err(ConfigError::ValidationError(
                "engine.max_nesting_depth must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Submitted jobs kept in the job history; older ones are forgotten
    pub max_job_history: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_job_history: 1000,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Per-job execution defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobDefaults {
    /// Capacity of the channels between source, pipeline and sink
    pub channel_capacity: usize,

    /// Deepest allowed nesting of window `inner` specifications
    pub max_nesting_depth: usize,
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            channel_capacity: 1,
            max_nesting_depth: 8,
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,

    /// Emit logs as JSON
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.engine.channel_capacity, 1);
        assert_eq!(config.engine.max_nesting_depth, 8);
        assert_eq!(config.observability.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_yaml_with_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "dataflow.yaml",
                r#"
server:
  port: 9000
engine:
  channel_capacity: 4
observability:
  json_logs: true
"#,
            )?;
            jail.set_env("DATAFLOW_SERVER__PORT", "9100");
            jail.set_env("DATAFLOW_SERVER__MAX_JOB_HISTORY", "50");

            let config = EngineConfig::load(Some(PathBuf::from("dataflow.yaml")))
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.server.port, 9100);
            assert_eq!(config.server.host, "0.0.0.0");
            assert_eq!(config.server.max_job_history, 50);
            assert_eq!(config.engine.channel_capacity, 4);
            assert_eq!(config.engine.max_nesting_depth, 8);
            assert!(config.observability.json_logs);
            Ok(())
        });
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        Jail::expect_with(|_jail| {
            let config = EngineConfig::load(None)
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config, EngineConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_validation_rejects_empty_job_history() {
        let mut config = EngineConfig::default();
        config.server.max_job_history = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        let mut config = EngineConfig::default();
        config.engine.channel_capacity = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
