//! Error types for the orchestrator pipeline.
//!
//! Errors carry context that chains through layers:
//! Sample → Stage → Operation → Detail

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::cache::CacheError;
use crate::process::ProcessError;

/// Top-level pipeline error with sample context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A stage failed. The run stops here.
    #[error("Sample '{sample}' failed at stage '{stage}': {source}")]
    StageFailed {
        sample: String,
        stage: String,
        #[source]
        source: StageError,
    },

    /// Auto-discovery found every raw sample already processed.
    #[error("No unprocessed '*{suffix}' samples left in {}", .raw_root.display())]
    NoUnprocessedSamples { raw_root: PathBuf, suffix: String },

    /// A requested stage name is not in the stage table.
    #[error("Unknown stage '{name}'")]
    UnknownStage { name: String },

    /// Failed to set up the run (create directories, etc.).
    #[error("Setup failed: {message}")]
    Setup { message: String },
}

impl PipelineError {
    /// Create a stage failed error.
    pub fn stage_failed(
        sample: impl Into<String>,
        stage: impl Into<String>,
        source: StageError,
    ) -> Self {
        Self::StageFailed {
            sample: sample.into(),
            stage: stage.into(),
            source,
        }
    }

    pub fn unknown_stage(name: impl Into<String>) -> Self {
        Self::UnknownStage { name: name.into() }
    }

    /// Create a setup failed error.
    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup {
            message: message.into(),
        }
    }
}

/// Error from a single stage.
#[derive(Error, Debug)]
pub enum StageError {
    /// A required upstream artifact is absent.
    #[error("Missing {what}: {}", .path.display())]
    MissingInput { what: String, path: PathBuf },

    /// A single-match precondition matched more than one file.
    #[error("Expected exactly one file matching '{pattern}', found {}: {}", .matches.len(), join_paths(.matches))]
    AmbiguousInput {
        pattern: String,
        matches: Vec<PathBuf>,
    },

    /// Inputs exist but are unusable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A reference file the stage needs is not configured.
    #[error("Reference '{key}' is not configured")]
    MissingReference { key: String },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl StageError {
    pub fn missing_input(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::MissingInput {
            what: what.into(),
            path: path.into(),
        }
    }

    pub fn ambiguous_input(pattern: impl Into<String>, matches: Vec<PathBuf>) -> Self {
        Self::AmbiguousInput {
            pattern: pattern.into(),
            matches,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn missing_reference(key: impl Into<String>) -> Self {
        Self::MissingReference { key: key.into() }
    }

    /// Create an I/O error with context.
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Fail with `MissingInput` unless `path` exists.
pub(crate) fn require_file(what: &str, path: &Path) -> StageResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(StageError::missing_input(what, path))
    }
}

/// Result type for stage operations.
pub type StageResult<T> = Result<T, StageError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
