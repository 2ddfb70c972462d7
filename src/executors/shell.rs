// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagerun contributors

//! Shell executor
//!
//! Runs a job's commands in one shell session with `set -e`, so the first
//! failing command ends the script and its status becomes the job's status.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::debug;

use super::{ScriptOutput, ScriptRunner};
use crate::errors::StagerunError;
use crate::pipeline::Environment;

/// Shell executor
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    /// Shell to use (bash, sh, etc.)
    shell: String,

    /// Working directory for every script
    working_dir: PathBuf,
}

impl ShellExecutor {
    /// Create a shell executor running in `working_dir`
    pub fn new(shell: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
            working_dir: working_dir.into(),
        }
    }

    /// Resolve the shell binary, failing if it is not installed
    pub fn resolve_shell(&self) -> Result<PathBuf, StagerunError> {
        which::which(&self.shell).map_err(|_| StagerunError::ShellNotFound {
            shell: self.shell.clone(),
        })
    }

    /// Build the script text handed to the shell
    fn build_script(script: &[String]) -> String {
        let mut text = String::from("exec 2>&1\nset -e\n");
        for command in script {
            text.push_str(command);
            text.push('\n');
        }
        text
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new("bash", ".")
    }
}

#[async_trait]
impl ScriptRunner for ShellExecutor {
    async fn run(
        &self,
        name: &str,
        script: &[String],
        env: &Environment,
    ) -> Result<ScriptOutput, StagerunError> {
        let start = Instant::now();

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(Self::build_script(script));
        cmd.current_dir(&self.working_dir);
        cmd.envs(env);
        cmd.stdin(Stdio::null());
        cmd.kill_on_drop(true);

        debug!(job = name, shell = %self.shell, commands = script.len(), "spawning script");

        let output = cmd
            .output()
            .await
            .map_err(|e| StagerunError::environment(name, &e))?;

        let duration = start.elapsed();
        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        // Anything the shell printed before the redirect took effect
        if !output.stderr.is_empty() {
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
        }

        // Killed by a signal: no code, report as a generic failure
        let exit_code = output.status.code().unwrap_or(-1);

        debug!(job = name, exit_code, elapsed_ms = duration.as_millis() as u64, "script finished");

        Ok(ScriptOutput {
            exit_code,
            output: combined,
            duration,
        })
    }

    async fn check_available(&self) -> Result<bool, StagerunError> {
        Ok(self.resolve_shell().is_ok() && self.working_dir.is_dir())
    }

    fn describe(&self) -> String {
        format!("{} in {}", self.shell, self.working_dir.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commands(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    fn sh() -> ShellExecutor {
        ShellExecutor::new("sh", ".")
    }

    #[test]
    fn test_build_script_merges_streams() {
        let text = ShellExecutor::build_script(&commands(&["echo a", "echo b"]));
        assert!(text.starts_with("exec 2>&1\nset -e\n"));
        assert!(text.ends_with("echo a\necho b\n"));
    }

    #[tokio::test]
    async fn test_execute_simple_command() {
        let result = sh()
            .run("hello", &commands(&["echo hello"]), &Environment::new())
            .await
            .unwrap();

        assert!(result.success());
        assert!(result.output.contains("hello"));
    }

    #[tokio::test]
    async fn test_stops_at_first_failing_command() {
        let result = sh()
            .run(
                "fails",
                &commands(&["echo before", "exit 3", "echo after"]),
                &Environment::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.exit_code, 3);
        assert!(result.output.contains("before"));
        assert!(!result.output.contains("after"));
    }

    #[tokio::test]
    async fn test_stderr_is_interleaved() {
        let result = sh()
            .run(
                "mixed",
                &commands(&["echo one", "echo two >&2", "echo three"]),
                &Environment::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.output, "one\ntwo\nthree\n");
    }

    #[tokio::test]
    async fn test_environment_is_passed() {
        let mut env = Environment::new();
        env.insert("STAGERUN_GREETING".into(), "hi there".into());

        let result = sh()
            .run("env", &commands(&["echo \"$STAGERUN_GREETING\""]), &env)
            .await
            .unwrap();

        assert_eq!(result.output.trim(), "hi there");
    }

    #[tokio::test]
    async fn test_state_carries_across_commands() {
        let result = sh()
            .run("state", &commands(&["X=42", "echo $X"]), &Environment::new())
            .await
            .unwrap();

        assert_eq!(result.output.trim(), "42");
    }

    #[tokio::test]
    async fn test_missing_shell_is_environment_error() {
        let executor = ShellExecutor::new("stagerun-no-such-shell", ".");

        let err = executor
            .run("lint", &commands(&["true"]), &Environment::new())
            .await
            .unwrap_err();

        assert!(matches!(err, StagerunError::Environment { .. }));
        assert!(!executor.check_available().await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_working_dir_is_environment_error() {
        let executor = ShellExecutor::new("sh", "/nonexistent/stagerun/dir");

        let err = executor
            .run("lint", &commands(&["true"]), &Environment::new())
            .await
            .unwrap_err();

        assert!(matches!(err, StagerunError::Environment { .. }));
    }
}
