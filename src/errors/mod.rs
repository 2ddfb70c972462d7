// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagerun contributors

//! Error types
//!
//! Loader and setup failures are fatal and surface as errors. Job and stage
//! failures are recorded as data in a `PipelineResult`; the `JobFailed` and
//! `Environment` variants exist so callers can turn a recorded failure back
//! into a diagnostic.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for stagerun operations
pub type StagerunResult<T> = Result<T, StagerunError>;

/// Main error type for stagerun
#[derive(Error, Debug, Diagnostic)]
pub enum StagerunError {
    // ─────────────────────────────────────────────────────────────────────────
    // Loader Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to parse pipeline definition: {message}")]
    #[diagnostic(
        code(stagerun::parse_error),
        help("The definition must be a YAML mapping with a `stages` list and job mappings")
    )]
    Parse { message: String },

    #[error("Pipeline definition is invalid:\n  - {}", errors.join("\n  - "))]
    #[diagnostic(code(stagerun::validation_error))]
    Validation { errors: Vec<String> },

    #[error("Job '{job}' has an invalid metric pattern: {error}")]
    #[diagnostic(
        code(stagerun::invalid_pattern),
        help("Patterns use Rust regex syntax; the first capture group becomes the metric")
    )]
    InvalidPattern { job: String, error: String },

    #[error("Pipeline file not found: {path}")]
    #[diagnostic(
        code(stagerun::pipeline_not_found),
        help("Pass a definition with --pipeline or create .stagerun.yml")
    )]
    PipelineNotFound { path: PathBuf },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(stagerun::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("before_script failed with exit code {exit_code}")]
    #[diagnostic(
        code(stagerun::setup_error),
        help("No stage was run. Fix the global setup commands first.")
    )]
    Setup { exit_code: i32 },

    #[error("Job '{job}' failed with exit code {exit_code}")]
    #[diagnostic(code(stagerun::job_failed))]
    JobFailed { job: String, exit_code: i32 },

    #[error("Could not create execution environment for '{job}': {error}")]
    #[diagnostic(code(stagerun::environment_error))]
    Environment {
        job: String,
        error: String,
        #[help]
        help: Option<String>,
    },

    #[error("Shell '{shell}' not found")]
    #[diagnostic(
        code(stagerun::shell_not_found),
        help("Install {shell} or choose another shell with --shell")
    )]
    ShellNotFound { shell: String },

    #[error("Pipeline failed")]
    #[diagnostic(code(stagerun::pipeline_failed))]
    PipelineFailed {
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid runner configuration: {message}")]
    #[diagnostic(code(stagerun::config_error))]
    Config { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(stagerun::io_error))]
    Io { message: String },

    #[error("YAML error: {message}")]
    #[diagnostic(code(stagerun::yaml_error))]
    Yaml { message: String },

    #[error("JSON error: {message}")]
    #[diagnostic(code(stagerun::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(stagerun::toml_error))]
    Toml { message: String },
}

impl From<std::io::Error> for StagerunError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for StagerunError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for StagerunError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for StagerunError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl StagerunError {
    /// Create a parse error from any displayable cause
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create an environment error with a hint derived from the OS error
    pub fn environment(job: &str, error: &std::io::Error) -> Self {
        let help = match error.kind() {
            std::io::ErrorKind::NotFound => {
                Some("The shell or working directory does not exist".to_string())
            }
            std::io::ErrorKind::PermissionDenied => {
                Some("Check execute permissions on the shell".to_string())
            }
            _ => None,
        };

        Self::Environment {
            job: job.to_string(),
            error: error.to_string(),
            help,
        }
    }

    /// Whether this error belongs to the loader (parse or validation)
    pub fn is_definition_error(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. } | Self::Validation { .. } | Self::InvalidPattern { .. }
        )
    }
}
