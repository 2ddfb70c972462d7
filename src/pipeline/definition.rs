// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagerun contributors

//! Pipeline definition structures
//!
//! The in-memory model produced by the loader: stages in execution order,
//! each holding its jobs, plus global setup commands and environment.

use indexmap::IndexMap;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::path::Path;

use crate::errors::{StagerunError, StagerunResult};

/// Ordered environment mapping (name → value)
pub type Environment = IndexMap<String, String>;

/// A validated pipeline definition
///
/// Constructed once per run and never mutated afterwards; the executor only
/// borrows it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    /// Commands run once before the first stage
    pub before_script: Vec<String>,

    /// Global environment shared read-only by every job
    pub environment: Environment,

    /// Stages, sorted by ascending `order`
    pub stages: Vec<Stage>,
}

impl Pipeline {
    /// Load and validate a pipeline from a file
    pub fn from_file(path: &Path) -> StagerunResult<Self> {
        if !path.exists() {
            return Err(StagerunError::PipelineNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| StagerunError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::from_yaml(&content)
    }

    /// Parse and validate a pipeline from YAML text
    pub fn from_yaml(yaml: &str) -> StagerunResult<Self> {
        super::loader::load(yaml)
    }

    /// Serialize the pipeline back to the YAML dialect it was loaded from
    pub fn to_yaml(&self) -> StagerunResult<String> {
        let mut doc = Mapping::new();

        doc.insert(
            "stages".into(),
            Value::Sequence(self.stages.iter().map(|s| s.name.clone().into()).collect()),
        );

        if !self.environment.is_empty() {
            doc.insert("variables".into(), env_to_value(&self.environment));
        }

        if !self.before_script.is_empty() {
            doc.insert("before_script".into(), commands_to_value(&self.before_script));
        }

        for job in self.jobs() {
            doc.insert(job.name.clone().into(), job.to_value());
        }

        serde_yaml::to_string(&doc).map_err(Into::into)
    }

    /// Get a stage by name
    pub fn get_stage(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Get a job by name
    pub fn get_job(&self, name: &str) -> Option<&Job> {
        self.jobs().find(|j| j.name == name)
    }

    /// Get all stage names in declaration order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// Iterate over every job, stage by stage
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.stages.iter().flat_map(|s| s.jobs.iter())
    }

    /// Total number of jobs
    pub fn job_count(&self) -> usize {
        self.stages.iter().map(|s| s.jobs.len()).sum()
    }
}

/// A named, ordered phase of the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    /// Stage name (must be unique within pipeline)
    pub name: String,

    /// Position in execution order (unique, ascending)
    pub order: usize,

    /// Jobs in declaration order
    pub jobs: Vec<Job>,
}

impl Stage {
    /// Create an empty stage
    pub fn new(name: impl Into<String>, order: usize) -> Self {
        Self {
            name: name.into(),
            order,
            jobs: Vec::new(),
        }
    }

    /// Add a job to this stage
    pub fn with_job(mut self, job: Job) -> Self {
        self.jobs.push(job);
        self
    }
}

/// A single unit of work belonging to exactly one stage
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    /// Job name (must be unique within pipeline)
    pub name: String,

    /// Name of the owning stage
    pub stage: String,

    /// Commands, run in one shell session
    pub script: Vec<String>,

    /// Pattern whose first capture group is reported as the job's metric
    pub extract_pattern: Option<MetricPattern>,

    /// A failure of this job does not fail its stage
    pub allow_failure: bool,

    /// Job-scoped variables layered over the global environment
    pub variables: Environment,
}

impl Job {
    /// Create a job with the given script
    pub fn new(name: impl Into<String>, stage: impl Into<String>, script: &[&str]) -> Self {
        Self {
            name: name.into(),
            stage: stage.into(),
            script: script.iter().map(|s| s.to_string()).collect(),
            extract_pattern: None,
            allow_failure: false,
            variables: Environment::new(),
        }
    }

    /// Attach a metric extraction pattern
    pub fn with_pattern(mut self, pattern: MetricPattern) -> Self {
        self.extract_pattern = Some(pattern);
        self
    }

    /// Mark the job as allowed to fail
    pub fn allowing_failure(mut self) -> Self {
        self.allow_failure = true;
        self
    }

    /// A job without commands trivially succeeds
    pub fn is_noop(&self) -> bool {
        self.script.iter().all(|line| line.trim().is_empty())
    }

    fn to_value(&self) -> Value {
        let mut map = Mapping::new();
        map.insert("stage".into(), self.stage.clone().into());
        if !self.script.is_empty() {
            map.insert("script".into(), commands_to_value(&self.script));
        }
        if let Some(pattern) = &self.extract_pattern {
            map.insert("coverage".into(), pattern.to_delimited().into());
        }
        if self.allow_failure {
            map.insert("allow_failure".into(), true.into());
        }
        if !self.variables.is_empty() {
            map.insert("variables".into(), env_to_value(&self.variables));
        }
        Value::Mapping(map)
    }
}

/// Compiled metric extraction pattern
#[derive(Debug, Clone)]
pub struct MetricPattern(Regex);

impl MetricPattern {
    /// Compile a pattern, accepting the `/regex/` delimited form
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let trimmed = source.trim();
        let body = trimmed
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
            .unwrap_or(trimmed);
        Regex::new(body).map(Self)
    }

    /// The regex source without delimiters
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Whether the pattern can yield a metric at all
    pub fn has_capture_group(&self) -> bool {
        self.0.captures_len() > 1
    }

    /// First capture group of the first match in `output`
    pub fn extract(&self, output: &str) -> Option<String> {
        self.0
            .captures(output)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn to_delimited(&self) -> String {
        format!("/{}/", self.0.as_str())
    }
}

impl PartialEq for MetricPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

fn commands_to_value(commands: &[String]) -> Value {
    Value::Sequence(commands.iter().map(|c| c.clone().into()).collect())
}

fn env_to_value(env: &Environment) -> Value {
    let mut map = Mapping::new();
    for (key, value) in env {
        map.insert(key.clone().into(), value.clone().into());
    }
    Value::Mapping(map)
}
