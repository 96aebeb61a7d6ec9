//! atacflow core - artifact-cached ATAC-seq pipeline execution
//!
//! This crate contains the pipeline logic with no CLI dependencies:
//! configuration, the artifact cache, external tool execution, the stage
//! table and sample selection. The `atacflow` binary is a thin layer on top.

pub mod cache;
pub mod config;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod process;

pub use orchestrator::{PipelineError, RunOptions, SampleProcessor, SampleRunReport};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
