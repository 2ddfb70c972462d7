// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagerun contributors

//! Pipeline definitions and execution
//!
//! This module defines the staged pipeline model, the loader that builds it
//! from text, its validation, and the executor that runs it.

mod definition;
mod executor;
mod loader;
mod result;
mod validation;

pub use definition::*;
pub use executor::{ExecutionOptions, PipelineExecutor};
pub use loader::load;
pub use result::{JobResult, JobStatus, Outcome, PipelineResult, StageResult};
pub use validation::{PipelineValidator, ValidationResult};
