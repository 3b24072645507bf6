//! Gate configuration document.
//!
//! ```yaml
//! pipeline_name: AdvancedDataQualityFramework
//! log_level: INFO
//! paths:
//!   report_path: reports/
//!   quarantine_path: quarantine/
//! quarantine:
//!   write_policy: replace
//! engine:
//!   batch_size: 8192
//! ```
//!
//! Only `paths` is required.

use crate::core::GateContextConfig;
use crate::prelude::*;
use crate::quarantine::WritePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level gate configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default = "default_pipeline_name")]
    pub pipeline_name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub paths: PathsConfig,
    #[serde(default)]
    pub quarantine: QuarantineConfig,
    #[serde(default)]
    pub engine: GateContextConfig,
}

/// Output locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    pub report_path: PathBuf,
    pub quarantine_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QuarantineConfig {
    #[serde(default)]
    pub write_policy: WritePolicy,
}

fn default_pipeline_name() -> String {
    "term-gate".to_string()
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl GateConfig {
    /// A configuration with defaults for everything but the output paths.
    pub fn new(report_path: impl Into<PathBuf>, quarantine_path: impl Into<PathBuf>) -> Self {
        Self {
            pipeline_name: default_pipeline_name(),
            log_level: default_log_level(),
            paths: PathsConfig {
                report_path: report_path.into(),
                quarantine_path: quarantine_path.into(),
            },
            quarantine: QuarantineConfig::default(),
            engine: GateContextConfig::default(),
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: GateConfig = serde_yaml::from_str(content)
            .map_err(|e| GateError::config(format!("Invalid gate configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GateError::config(format!("Cannot read gate configuration {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&content).with_context(|| format!("{}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if self.pipeline_name.trim().is_empty() {
            return Err(GateError::config("pipeline_name cannot be empty"));
        }
        if self.paths.report_path.as_os_str().is_empty() {
            return Err(GateError::config("paths.report_path cannot be empty"));
        }
        if self.paths.quarantine_path.as_os_str().is_empty() {
            return Err(GateError::config("paths.quarantine_path cannot be empty"));
        }
        if self.engine.batch_size == 0 || self.engine.target_partitions == 0 {
            return Err(GateError::config(
                "engine.batch_size and engine.target_partitions must be greater than zero",
            ));
        }
        Ok(())
    }
}
