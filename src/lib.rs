// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagerun contributors

//! # stagerun - Staged Job Runner
//!
//! `stagerun` executes declarative CI pipeline definitions: named jobs grouped
//! into ordered stages, each job running a short shell script.
//!
//! ## Features
//!
//! - **Staged execution** - Stages run strictly in order, jobs within a stage run concurrently
//! - **Fail-fast** - A failing stage marks every later stage as skipped
//! - **Metric extraction** - Pull values such as coverage out of job output
//! - **Text and JSON reports** - With a deterministic exit code
//!
//! ## Quick Start
//!
//! ```bash
//! # Check a definition
//! stagerun validate .stagerun.yml
//!
//! # Run the pipeline
//! stagerun run
//!
//! # Run only one stage, report as JSON
//! stagerun run --stage unit-test --format json
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod executors;
pub mod pipeline;
pub mod report;
pub mod utils;

// Re-export commonly used types
pub use errors::{StagerunError, StagerunResult};
pub use pipeline::{Job, Pipeline, PipelineResult, Stage};
pub use report::{Report, Reporter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
