// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagerun contributors

//! Result reporting
//!
//! Turns a [`PipelineResult`] into a human-readable summary and a set of
//! extracted metrics. Rendering is a pure function of its input: the same
//! result always renders to the same text.

mod json;

pub use json::JsonReport;

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;

use crate::pipeline::{JobResult, JobStatus, Outcome, Pipeline, PipelineResult};

/// A metric pulled out of a job's output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobMetric {
    /// Job the metric came from
    pub job: String,
    /// Stage the job belongs to
    pub stage: String,
    /// First capture group of the job's pattern
    pub value: String,
}

/// Rendered report
#[derive(Debug, Clone)]
pub struct Report {
    /// Human-readable summary
    pub summary: String,
    /// Extracted metrics in execution order
    pub metrics: Vec<JobMetric>,
}

/// Renders pipeline results
pub struct Reporter<'a> {
    pipeline: &'a Pipeline,
    color: bool,
}

impl<'a> Reporter<'a> {
    /// Create a reporter for results of `pipeline`
    pub fn new(pipeline: &'a Pipeline) -> Self {
        Self {
            pipeline,
            color: false,
        }
    }

    /// Enable or disable ANSI colours
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Build the full report
    pub fn report(&self, result: &PipelineResult) -> Report {
        let metrics = self.metrics(result);
        let summary = self.render(result, &metrics);
        Report { summary, metrics }
    }

    /// Extract a metric from every job whose pattern matches its output
    pub fn metrics(&self, result: &PipelineResult) -> Vec<JobMetric> {
        result
            .stages
            .iter()
            .flat_map(|stage| stage.job_results.iter())
            .filter_map(|job_result| {
                let value = self.metric_for(job_result)?;
                Some(JobMetric {
                    job: job_result.job_name.clone(),
                    stage: job_result.stage.clone(),
                    value,
                })
            })
            .collect()
    }

    /// Metric for one job result, if its job declares a matching pattern
    pub fn metric_for(&self, job_result: &JobResult) -> Option<String> {
        self.pipeline
            .get_job(&job_result.job_name)?
            .extract_pattern
            .as_ref()?
            .extract(&job_result.output)
    }

    /// JSON document for machine consumers
    pub fn json(&self, result: &PipelineResult) -> JsonReport {
        JsonReport::build(result, &self.metrics(result))
    }

    fn render(&self, result: &PipelineResult, metrics: &[JobMetric]) -> String {
        let mut out = String::new();

        if let Some(setup) = &result.setup {
            let _ = writeln!(out, "{}", self.bold("Setup"));
            let _ = writeln!(out, "  {}", self.job_line(setup, None));
            out.push('\n');
        }

        let _ = writeln!(out, "{}", self.bold("Stages"));
        if result.stages.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for stage in &result.stages {
            let _ = writeln!(
                out,
                "{} {} ({})",
                self.outcome_symbol(stage.outcome),
                stage.stage_name,
                stage.outcome
            );
            for job_result in &stage.job_results {
                let metric = metrics
                    .iter()
                    .find(|m| m.job == job_result.job_name)
                    .map(|m| m.value.as_str());
                let _ = writeln!(out, "  {}", self.job_line(job_result, metric));
            }
        }

        let failed: Vec<&JobResult> = result
            .setup
            .iter()
            .chain(result.stages.iter().flat_map(|s| s.job_results.iter()))
            .filter(|j| !j.succeeded() && !j.output.trim().is_empty())
            .collect();

        if !failed.is_empty() {
            out.push('\n');
            let _ = writeln!(out, "{}", self.bold("Failed job output"));
            for job_result in failed {
                let _ = writeln!(out, "--- {} ---", job_result.job_name);
                for line in job_result.output.lines() {
                    let _ = writeln!(out, "    {}", line);
                }
            }
        }

        if !metrics.is_empty() {
            out.push('\n');
            let _ = writeln!(out, "{}", self.bold("Metrics"));
            for metric in metrics {
                let _ = writeln!(out, "  {} ({}): {}", metric.job, metric.stage, metric.value);
            }
        }

        out.push('\n');
        let verdict = format!(
            "Pipeline {} in {:.2}s",
            result.outcome,
            result.duration.as_secs_f64()
        );
        let verdict = if !self.color {
            verdict
        } else if result.passed() {
            verdict.green().bold().to_string()
        } else {
            verdict.red().bold().to_string()
        };
        let _ = writeln!(out, "{}", verdict);

        out
    }

    fn job_line(&self, job_result: &JobResult, metric: Option<&str>) -> String {
        let (symbol, status) = match &job_result.status {
            JobStatus::Passed => (self.paint("✓", Tint::Green), "passed".to_string()),
            JobStatus::Failed { exit_code } if job_result.allow_failure => (
                self.paint("!", Tint::Yellow),
                format!("failed (exit {exit_code}, allowed)"),
            ),
            JobStatus::Failed { exit_code } => {
                (self.paint("✗", Tint::Red), format!("failed (exit {exit_code})"))
            }
            JobStatus::EnvironmentError { message } => (
                self.paint("✗", Tint::Red),
                format!("environment error: {message}"),
            ),
        };

        match metric {
            Some(value) => format!("{} {} {} [{}]", symbol, job_result.job_name, status, value),
            None => format!("{} {} {}", symbol, job_result.job_name, status),
        }
    }

    fn outcome_symbol(&self, outcome: Outcome) -> String {
        match outcome {
            Outcome::Passed => self.paint("✓", Tint::Green),
            Outcome::Failed => self.paint("✗", Tint::Red),
            Outcome::Skipped => self.paint("○", Tint::Dim),
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.color {
            format!("{}:", text.bold())
        } else {
            format!("{}:", text)
        }
    }

    fn paint(&self, text: &str, tint: Tint) -> String {
        if !self.color {
            return text.to_string();
        }
        match tint {
            Tint::Green => text.green().to_string(),
            Tint::Red => text.red().to_string(),
            Tint::Yellow => text.yellow().to_string(),
            Tint::Dim => text.dimmed().to_string(),
        }
    }
}

#[derive(Clone, Copy)]
enum Tint {
    Green,
    Red,
    Yellow,
    Dim,
}
