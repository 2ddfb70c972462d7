// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagerun contributors

//! Script runners
//!
//! The executor's only external call: run an ordered list of commands in an
//! environment and report the exit status and combined output.

mod shell;

pub use shell::ShellExecutor;

use async_trait::async_trait;
use std::time::Duration;

use crate::errors::StagerunError;
use crate::pipeline::Environment;

/// Output of one script run
#[derive(Debug, Clone)]
pub struct ScriptOutput {
    /// Exit code of the last command executed
    pub exit_code: i32,

    /// stdout and stderr interleaved in emission order
    pub output: String,

    /// Execution duration
    pub duration: Duration,
}

impl ScriptOutput {
    /// Whether the script exited 0
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Trait for script runners
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Run `script` for the job named `name`
    ///
    /// `env` holds the variables to add on top of the inherited process
    /// environment. An `Err` means the execution context itself could not be
    /// created; a script that runs and exits nonzero is an `Ok`.
    async fn run(
        &self,
        name: &str,
        script: &[String],
        env: &Environment,
    ) -> Result<ScriptOutput, StagerunError>;

    /// Check that the runner can start processes at all
    async fn check_available(&self) -> Result<bool, StagerunError>;

    /// Short description used in plans and logs
    fn describe(&self) -> String;
}
