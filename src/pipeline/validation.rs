// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagerun contributors

//! Pipeline validation
//!
//! Validates pipeline structure before execution.

use std::collections::HashSet;

use crate::pipeline::{Pipeline, Stage};

/// Pipeline validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a pipeline configuration
    pub fn validate(pipeline: &Pipeline) -> ValidationResult {
        let mut result = ValidationResult::new();

        // Check for duplicate stage names and orders
        let mut seen_names = HashSet::new();
        let mut seen_orders = HashSet::new();
        for stage in &pipeline.stages {
            if stage.name.trim().is_empty() {
                result.add_error("Stage name is empty");
            }
            if !seen_names.insert(stage.name.as_str()) {
                result.add_error(&format!("Duplicate stage name: '{}'", stage.name));
            }
            if !seen_orders.insert(stage.order) {
                result.add_error(&format!(
                    "Stage '{}' shares order {} with another stage",
                    stage.name, stage.order
                ));
            }
        }

        // Stages must be stored in ascending order
        if pipeline
            .stages
            .windows(2)
            .any(|pair| pair[0].order > pair[1].order)
        {
            result.add_error("Stages are not in ascending order");
        }

        // Job names are unique across the whole pipeline
        let mut seen_jobs = HashSet::new();
        for job in pipeline.jobs() {
            if !seen_jobs.insert(job.name.as_str()) {
                result.add_error(&format!("Duplicate job name: '{}'", job.name));
            }
        }

        for stage in &pipeline.stages {
            Self::validate_stage(stage, &mut result);
        }

        if pipeline.before_script.iter().any(|c| c.trim().is_empty()) {
            result.add_warning("before_script contains an empty command");
        }

        result
    }

    /// Validate a single stage and its jobs
    fn validate_stage(stage: &Stage, result: &mut ValidationResult) {
        if stage.jobs.is_empty() {
            result.add_warning(&format!(
                "Stage '{}' has no jobs and will pass trivially",
                stage.name
            ));
        }

        for job in &stage.jobs {
            if job.name.trim().is_empty() {
                result.add_error(&format!("Stage '{}': job name is empty", stage.name));
            }

            if job.stage != stage.name {
                result.add_error(&format!(
                    "Job '{}' references undeclared stage '{}'",
                    job.name, job.stage
                ));
            }

            if job.is_noop() {
                result.add_warning(&format!("Job '{}': no script, job is a no-op", job.name));
            }

            if let Some(pattern) = &job.extract_pattern {
                if !pattern.has_capture_group() {
                    result.add_warning(&format!(
                        "Job '{}': pattern '{}' has no capture group, no metric will be extracted",
                        job.name,
                        pattern.as_str()
                    ));
                }
            }
        }
    }
}

/// Result of pipeline validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
