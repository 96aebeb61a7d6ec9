//! Pipeline stage trait definition.
//!
//! All pipeline stages implement this trait. The skip/force/validate/run
//! sequence around it lives in `StageExecutor`, so a stage only describes
//! its artifacts and its commands.

use std::path::PathBuf;

use crate::cache::Artifact;

use super::errors::StageResult;
use super::types::Context;

/// Trait for pipeline stages.
///
/// `StageExecutor` calls these methods in order:
///
/// 1. `expected_outputs` - what a completed stage leaves on disk
/// 2. `clean_dirs` and `clean_files` - only when forcing, removed before
///    anything runs
/// 3. `validate_inputs` - upstream artifacts and references
/// 4. `execute` - run the tools
///
/// # Example
///
/// ```ignore
/// struct CoverageStage;
///
/// impl PipelineStage for CoverageStage {
///     fn name(&self) -> &str { "coverage" }
///
///     fn expected_outputs(&self, ctx: &Context) -> Vec<Artifact> {
///         vec![Artifact::file(ctx.layout.coverage_bigwig())]
///     }
///
///     fn clean_dirs(&self, ctx: &Context) -> Vec<PathBuf> {
///         vec![ctx.layout.coverage_dir()]
///     }
///
///     fn validate_inputs(&self, ctx: &Context) -> StageResult<()> {
///         require_file("filtered BAM", &ctx.layout.filtered_bam())
///     }
///
///     fn execute(&self, ctx: &Context) -> StageResult<()> {
///         ctx.run(&ToolCommand::new("bamCoverage").args([...]))
///     }
/// }
/// ```
pub trait PipelineStage: Send + Sync {
    /// Stage name as used on the command line.
    fn name(&self) -> &str;

    /// Whether a full run (no stages requested) includes this stage.
    fn runs_by_default(&self) -> bool {
        true
    }

    /// Artifacts whose validity marks this stage as done for the sample.
    ///
    /// Includes companion files such as BAM indexes. An empty list never
    /// counts as cached.
    fn expected_outputs(&self, ctx: &Context) -> Vec<Artifact>;

    /// Directories wiped before a forced rebuild.
    fn clean_dirs(&self, ctx: &Context) -> Vec<PathBuf>;

    /// Individual files removed before a forced rebuild, for outputs that
    /// live in a directory another stage also writes to.
    fn clean_files(&self, _ctx: &Context) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Check upstream artifacts and configured references.
    fn validate_inputs(&self, ctx: &Context) -> StageResult<()>;

    /// Run the stage's commands.
    fn execute(&self, ctx: &Context) -> StageResult<()>;

    /// Human-readable description of what this stage does.
    fn description(&self) -> &str {
        self.name()
    }
}
