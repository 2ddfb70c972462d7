// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagerun contributors

//! JSON report document

use serde::Serialize;

use super::JobMetric;
use crate::pipeline::{JobResult, JobStatus, Outcome, PipelineResult};

/// Machine-readable pipeline report
#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub outcome: Outcome,
    pub exit_code: i32,
    pub duration_ms: u64,
    pub setup: Option<JsonJob>,
    pub stages: Vec<JsonStage>,
    pub metrics: Vec<JobMetric>,
}

#[derive(Debug, Serialize)]
pub struct JsonStage {
    pub name: String,
    pub outcome: Outcome,
    pub duration_ms: u64,
    pub jobs: Vec<JsonJob>,
}

#[derive(Debug, Serialize)]
pub struct JsonJob {
    pub name: String,
    #[serde(flatten)]
    pub status: JobStatus,
    pub allow_failure: bool,
    pub metric: Option<String>,
    pub duration_ms: u64,
    pub output: String,
}

impl JsonReport {
    pub(super) fn build(result: &PipelineResult, metrics: &[JobMetric]) -> Self {
        let job = |job_result: &JobResult| JsonJob {
            name: job_result.job_name.clone(),
            status: job_result.status.clone(),
            allow_failure: job_result.allow_failure,
            metric: metrics
                .iter()
                .find(|m| m.job == job_result.job_name)
                .map(|m| m.value.clone()),
            duration_ms: job_result.duration.as_millis() as u64,
            output: job_result.output.clone(),
        };

        Self {
            outcome: result.outcome,
            exit_code: result.exit_code(),
            duration_ms: result.duration.as_millis() as u64,
            setup: result.setup.as_ref().map(job),
            stages: result
                .stages
                .iter()
                .map(|stage| JsonStage {
                    name: stage.stage_name.clone(),
                    outcome: stage.outcome,
                    duration_ms: stage.duration.as_millis() as u64,
                    jobs: stage.job_results.iter().map(job).collect(),
                })
                .collect(),
            metrics: metrics.to_vec(),
        }
    }

    /// Pretty-printed JSON text
    pub fn to_string_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
