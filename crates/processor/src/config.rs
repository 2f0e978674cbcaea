//! Configuration types for the job engine
//!
//! These are the per-job knobs the engine applies when it wires a source, a
//! pipeline and a sink together. The service-level configuration file maps
//! onto them.

use crate::error::{ProcessorError, Result};
use crate::pipeline::MAX_NESTING_DEPTH;
use serde::{Deserialize, Serialize};

/// Job execution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Capacity of the source-to-pipeline and pipeline-to-sink channels
    ///
    /// The default of 1 makes every hand-off synchronous, which is the only
    /// backpressure between the three tasks of a job.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Deepest allowed nesting of `inner` operator specifications
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            max_nesting_depth: default_max_nesting_depth(),
        }
    }
}

impl JobConfig {
    pub fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(ProcessorError::Configuration {
                source: "channel_capacity must be greater than 0".into(),
            });
        }

        if self.max_nesting_depth == 0 {
            return Err(ProcessorError::Configuration {
                source: "max_nesting_depth must be greater than 0".into(),
            });
        }

        Ok(())
    }
}

fn default_channel_capacity() -> usize {
    1
}

fn default_max_nesting_depth() -> usize {
    MAX_NESTING_DEPTH
}
