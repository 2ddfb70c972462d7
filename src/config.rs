// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagerun contributors

//! Runner configuration
//!
//! Loaded from `stagerun.toml` (or `--config`); command-line flags override
//! whatever the file sets.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{StagerunError, StagerunResult};

/// Default configuration file name
pub const CONFIG_FILE: &str = "stagerun.toml";

/// Default pipeline definition file name
pub const DEFAULT_PIPELINE: &str = ".stagerun.yml";

/// Runner configuration from stagerun.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Shell used to run job scripts
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Maximum concurrent jobs per stage (0 = unbounded)
    #[serde(default)]
    pub max_parallel: usize,

    /// Pipeline definition file
    #[serde(default = "default_pipeline")]
    pub pipeline: PathBuf,

    /// Force colours on or off (unset = detect terminal)
    #[serde(default)]
    pub color: Option<bool>,
}

fn default_shell() -> String {
    "bash".to_string()
}

fn default_pipeline() -> PathBuf {
    PathBuf::from(DEFAULT_PIPELINE)
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            max_parallel: 0,
            pipeline: default_pipeline(),
            color: None,
        }
    }
}

impl RunnerConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> StagerunResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load an explicit configuration file
    pub fn from_file(path: &Path) -> StagerunResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StagerunError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Load `explicit` if given, else `stagerun.toml` in `dir` if present, else defaults
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> StagerunResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "loading runner configuration");
            Self::from_file(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply command-line overrides
    pub fn with_overrides(
        mut self,
        shell: Option<String>,
        max_parallel: Option<usize>,
        pipeline: Option<PathBuf>,
    ) -> Self {
        if let Some(shell) = shell {
            self.shell = shell;
        }
        if let Some(max_parallel) = max_parallel {
            self.max_parallel = max_parallel;
        }
        if let Some(pipeline) = pipeline {
            self.pipeline = pipeline;
        }
        self
    }

    fn validate(&self) -> StagerunResult<()> {
        if self.shell.trim().is_empty() {
            return Err(StagerunError::Config {
                message: "shell must not be empty".into(),
            });
        }
        Ok(())
    }
}
