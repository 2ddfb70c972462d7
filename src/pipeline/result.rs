// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagerun contributors

//! Execution results
//!
//! Failures are data here: the executor records every job and stage outcome
//! so a complete report can always be rendered.

use serde::Serialize;
use std::time::Duration;

use crate::errors::StagerunError;

/// Outcome of a stage or of the whole pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// How a script run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    /// Every command exited 0
    Passed,
    /// A command exited nonzero
    Failed { exit_code: i32 },
    /// The process could not be started
    EnvironmentError { message: String },
}

/// Result of running one job (or the global `before_script`)
#[derive(Debug, Clone)]
pub struct JobResult {
    /// Job name
    pub job_name: String,

    /// Owning stage (empty for `before_script`)
    pub stage: String,

    /// How the script ended
    pub status: JobStatus,

    /// Combined stdout and stderr in emission order
    pub output: String,

    /// Failure does not fail the stage
    pub allow_failure: bool,

    /// Wall-clock duration
    pub duration: Duration,
}

impl JobResult {
    /// Whether the script ran to completion with status 0
    pub fn succeeded(&self) -> bool {
        self.status == JobStatus::Passed
    }

    /// Whether this result fails its stage
    pub fn fails_stage(&self) -> bool {
        !self.succeeded() && !self.allow_failure
    }

    /// Exit code, if the process ran
    pub fn exit_code(&self) -> Option<i32> {
        match &self.status {
            JobStatus::Passed => Some(0),
            JobStatus::Failed { exit_code } => Some(*exit_code),
            JobStatus::EnvironmentError { .. } => None,
        }
    }

    /// Convert a failed result into the matching diagnostic
    pub fn to_error(&self) -> Option<StagerunError> {
        match &self.status {
            JobStatus::Passed => None,
            JobStatus::Failed { exit_code } => Some(StagerunError::JobFailed {
                job: self.job_name.clone(),
                exit_code: *exit_code,
            }),
            JobStatus::EnvironmentError { message } => Some(StagerunError::Environment {
                job: self.job_name.clone(),
                error: message.clone(),
                help: None,
            }),
        }
    }
}

/// Result of one stage
#[derive(Debug, Clone)]
pub struct StageResult {
    /// Stage name
    pub stage_name: String,

    /// Stage outcome
    pub outcome: Outcome,

    /// Job results in declaration order (empty when skipped)
    pub job_results: Vec<JobResult>,

    /// Time from first job start to last job completion
    pub duration: Duration,
}

impl StageResult {
    /// A stage that never ran
    pub fn skipped(name: &str) -> Self {
        Self {
            stage_name: name.to_string(),
            outcome: Outcome::Skipped,
            job_results: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Build a finished stage; fails if any job fails it
    pub fn finished(name: &str, job_results: Vec<JobResult>, duration: Duration) -> Self {
        let outcome = if job_results.iter().any(JobResult::fails_stage) {
            Outcome::Failed
        } else {
            Outcome::Passed
        };

        Self {
            stage_name: name.to_string(),
            outcome,
            job_results,
            duration,
        }
    }
}

/// Result of a whole pipeline run
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// `before_script` result, when there was one to run
    pub setup: Option<JobResult>,

    /// Stage results in execution order
    pub stages: Vec<StageResult>,

    /// Overall outcome
    pub outcome: Outcome,

    /// Total execution time
    pub duration: Duration,
}

impl PipelineResult {
    /// Whether the pipeline passed
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }

    /// Process exit code for this result
    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }

    /// Whether `before_script` failed
    pub fn setup_failed(&self) -> bool {
        self.setup.as_ref().is_some_and(|s| !s.succeeded())
    }

    /// Look up a stage result by name
    pub fn stage(&self, name: &str) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.stage_name == name)
    }

    /// Look up a job result by name
    pub fn job(&self, name: &str) -> Option<&JobResult> {
        self.stages
            .iter()
            .flat_map(|s| s.job_results.iter())
            .find(|j| j.job_name == name)
    }

    /// The error that explains why the pipeline failed
    pub fn failure(&self) -> Option<StagerunError> {
        if self.passed() {
            return None;
        }

        if let Some(setup) = self.setup.as_ref().filter(|s| !s.succeeded()) {
            return match setup.exit_code() {
                Some(exit_code) => Some(StagerunError::Setup { exit_code }),
                // Setup never started; report the environment problem itself
                None => setup.to_error(),
            };
        }

        let failed_job = self
            .stages
            .iter()
            .filter(|s| s.outcome == Outcome::Failed)
            .flat_map(|s| s.job_results.iter())
            .find(|j| j.fails_stage());

        Some(
            failed_job
                .and_then(JobResult::to_error)
                .unwrap_or(StagerunError::PipelineFailed { help: None }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(name: &str, status: JobStatus, allow_failure: bool) -> JobResult {
        JobResult {
            job_name: name.into(),
            stage: "test".into(),
            status,
            output: String::new(),
            allow_failure,
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_stage_fails_on_any_failed_job() {
        let stage = StageResult::finished(
            "test",
            vec![
                job("a", JobStatus::Passed, false),
                job("b", JobStatus::Failed { exit_code: 2 }, false),
            ],
            Duration::ZERO,
        );
        assert_eq!(stage.outcome, Outcome::Failed);
    }

    #[test]
    fn test_allowed_failure_keeps_stage_passing() {
        let stage = StageResult::finished(
            "test",
            vec![job("flaky", JobStatus::Failed { exit_code: 1 }, true)],
            Duration::ZERO,
        );
        assert_eq!(stage.outcome, Outcome::Passed);
    }

    #[test]
    fn test_environment_error_fails_stage() {
        let stage = StageResult::finished(
            "test",
            vec![job(
                "a",
                JobStatus::EnvironmentError {
                    message: "no shell".into(),
                },
                false,
            )],
            Duration::ZERO,
        );
        assert_eq!(stage.outcome, Outcome::Failed);
        assert_eq!(stage.job_results[0].exit_code(), None);
    }

    #[test]
    fn test_empty_stage_passes() {
        let stage = StageResult::finished("empty", vec![], Duration::ZERO);
        assert_eq!(stage.outcome, Outcome::Passed);
    }

    #[test]
    fn test_failure_points_at_failed_job() {
        let result = PipelineResult {
            setup: None,
            stages: vec![
                StageResult::finished(
                    "lint",
                    vec![job("flake8", JobStatus::Failed { exit_code: 1 }, false)],
                    Duration::ZERO,
                ),
                StageResult::skipped("test"),
            ],
            outcome: Outcome::Failed,
            duration: Duration::ZERO,
        };

        assert_eq!(result.exit_code(), 1);
        match result.failure() {
            Some(StagerunError::JobFailed { job, exit_code }) => {
                assert_eq!(job, "flake8");
                assert_eq!(exit_code, 1);
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[test]
    fn test_setup_that_cannot_start_reports_environment_error() {
        let mut setup = job(
            "before_script",
            JobStatus::EnvironmentError {
                message: "shell not found".into(),
            },
            false,
        );
        setup.stage = String::new();

        let result = PipelineResult {
            setup: Some(setup),
            stages: vec![StageResult::skipped("lint")],
            outcome: Outcome::Failed,
            duration: Duration::ZERO,
        };

        assert!(result.setup_failed());
        match result.failure() {
            Some(StagerunError::Environment { job, error, .. }) => {
                assert_eq!(job, "before_script");
                assert_eq!(error, "shell not found");
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[test]
    fn test_setup_exit_code_is_reported() {
        let result = PipelineResult {
            setup: Some(job("before_script", JobStatus::Failed { exit_code: 7 }, false)),
            stages: vec![StageResult::skipped("lint")],
            outcome: Outcome::Failed,
            duration: Duration::ZERO,
        };

        assert!(matches!(
            result.failure(),
            Some(StagerunError::Setup { exit_code: 7 })
        ));
    }
}
