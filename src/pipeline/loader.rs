// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagerun contributors

//! Pipeline loader
//!
//! Turns the YAML staged-CI dialect into a validated [`Pipeline`]. Top-level
//! keys are either global settings (`stages`, `variables`, `before_script`
//! and friends) or job mappings. Commented-out jobs never reach this module:
//! the YAML parser discards comments, so they have no representation at all.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::definition::{Environment, Job, MetricPattern, Pipeline, Stage};
use super::validation::PipelineValidator;
use crate::errors::{StagerunError, StagerunResult};

/// Top-level keys that never declare a job
const RESERVED_KEYS: &[&str] = &[
    "stages",
    "variables",
    "environment",
    "before_script",
    "after_script",
    "image",
    "services",
    "cache",
    "default",
    "include",
    "workflow",
];

/// Script given either as one string or as a list of commands
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Commands {
    Single(String),
    Multiple(Vec<String>),
}

impl Commands {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::Single(s) => vec![s],
            Self::Multiple(v) => v,
        }
    }
}

/// Job mapping as written; unknown fields are ignored
#[derive(Debug, Deserialize)]
struct RawJob {
    stage: String,

    #[serde(default)]
    script: Option<Commands>,

    #[serde(default, alias = "extract_pattern")]
    coverage: Option<String>,

    #[serde(default)]
    allow_failure: bool,

    #[serde(default)]
    variables: IndexMap<String, Value>,
}

/// Parse and validate pipeline text
pub fn load(text: &str) -> StagerunResult<Pipeline> {
    if text.trim().is_empty() {
        return Err(StagerunError::parse("pipeline definition is empty"));
    }

    let document: Value = serde_yaml::from_str(text).map_err(classify_yaml_error)?;
    let Value::Mapping(root) = document else {
        return Err(StagerunError::parse("top level must be a mapping"));
    };

    let mut errors = Vec::new();
    let stage_names: Vec<String> = field(&root, "stages")?.unwrap_or_default();
    let before_script = field::<Commands>(&root, "before_script")?
        .map(Commands::into_vec)
        .unwrap_or_default();
    let environment = match field::<IndexMap<String, Value>>(&root, "variables")? {
        Some(vars) => into_environment(vars).map_err(StagerunError::parse)?,
        None => field::<IndexMap<String, Value>>(&root, "environment")?
            .map(into_environment)
            .transpose()
            .map_err(StagerunError::parse)?
            .unwrap_or_default(),
    };

    let mut stages: Vec<Stage> = stage_names
        .iter()
        .enumerate()
        .map(|(order, name)| Stage::new(name.clone(), order))
        .collect();

    for (key, value) in &root {
        let Some(name) = key.as_str() else {
            return Err(StagerunError::parse(format!(
                "top-level keys must be strings, found {key:?}"
            )));
        };

        if RESERVED_KEYS.contains(&name) || name.starts_with('.') || !value.is_mapping() {
            continue;
        }

        let mut raw: RawJob = serde_yaml::from_value(value.clone())
            .map_err(|e| StagerunError::parse(format!("job '{name}': {e}")))?;
        let variables = into_environment(std::mem::take(&mut raw.variables))
            .map_err(|e| StagerunError::parse(format!("job '{name}': {e}")))?;

        let job = match build_job(name, raw, variables) {
            Ok(job) => job,
            Err(e) => {
                errors.push(e.to_string());
                continue;
            }
        };

        match stages.iter_mut().find(|s| s.name == job.stage) {
            Some(stage) => stage.jobs.push(job),
            None => errors.push(format!(
                "Job '{}' references undeclared stage '{}'",
                job.name, job.stage
            )),
        }
    }

    let pipeline = Pipeline {
        before_script,
        environment,
        stages,
    };

    let validation = PipelineValidator::validate(&pipeline);
    for error in validation.errors {
        if !errors.contains(&error) {
            errors.push(error);
        }
    }

    if !errors.is_empty() {
        return Err(StagerunError::Validation { errors });
    }

    debug!(
        stages = pipeline.stages.len(),
        jobs = pipeline.job_count(),
        "loaded pipeline definition"
    );

    Ok(pipeline)
}

fn build_job(name: &str, raw: RawJob, variables: Environment) -> StagerunResult<Job> {
    let extract_pattern = raw
        .coverage
        .as_deref()
        .map(MetricPattern::new)
        .transpose()
        .map_err(|e| StagerunError::InvalidPattern {
            job: name.to_string(),
            error: e.to_string(),
        })?;

    Ok(Job {
        name: name.to_string(),
        stage: raw.stage,
        script: raw.script.map(Commands::into_vec).unwrap_or_default(),
        extract_pattern,
        allow_failure: raw.allow_failure,
        variables,
    })
}

/// Deserialize an optional top-level field
fn field<T: serde::de::DeserializeOwned>(
    root: &Mapping,
    key: &str,
) -> StagerunResult<Option<T>> {
    match root.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_yaml::from_value(value.clone())
            .map(Some)
            .map_err(|e| StagerunError::parse(format!("'{key}': {e}"))),
    }
}

/// Convert variable values to strings; `KEY:` with no value is empty
///
/// Numbers are read as YAML numbers, so `3.10` becomes `3.1`. Quote values
/// whose exact text matters.
fn into_environment(vars: IndexMap<String, Value>) -> Result<Environment, String> {
    vars.into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Null => String::new(),
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::String(s) => s,
                _ => return Err(format!("variable '{key}' must be a string, number or boolean")),
            };
            Ok((key, value))
        })
        .collect()
}

/// Duplicate mapping keys are a consistency problem, not a syntax one
fn classify_yaml_error(e: serde_yaml::Error) -> StagerunError {
    let message = e.to_string();
    if message.contains("duplicate entry") {
        StagerunError::Validation {
            errors: vec![format!("Duplicate job or setting name: {message}")],
        }
    } else {
        StagerunError::parse(message)
    }
}
