//! Pipeline runner that executes stages in table order.

use super::errors::{PipelineError, PipelineResult};
use super::executor::StageExecutor;
use super::stage::PipelineStage;
use super::types::{Context, StageOutcome};

/// Ordered stage table.
///
/// The table order is the dependency order. Stages are never reordered;
/// a partial run picks a subset and still walks it in table order.
pub struct Pipeline {
    /// Stages in canonical order.
    stages: Vec<Box<dyn PipelineStage>>,
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Add a stage to the pipeline.
    pub fn add_stage<S: PipelineStage + 'static>(&mut self, stage: S) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Add a stage (builder pattern).
    pub fn with_stage<S: PipelineStage + 'static>(mut self, stage: S) -> Self {
        self.add_stage(stage);
        self
    }

    /// Resolve requested names to stages, in table order, once each.
    ///
    /// An empty request selects every stage that runs by default.
    pub fn select(&self, names: &[String]) -> PipelineResult<Vec<&dyn PipelineStage>> {
        if names.is_empty() {
            return Ok(self
                .stages
                .iter()
                .filter(|s| s.runs_by_default())
                .map(|s| s.as_ref())
                .collect());
        }

        if let Some(unknown) = names
            .iter()
            .find(|n| !self.stages.iter().any(|s| s.name() == n.as_str()))
        {
            return Err(PipelineError::unknown_stage(unknown.as_str()));
        }

        Ok(self
            .stages
            .iter()
            .filter(|s| names.iter().any(|n| n == s.name()))
            .map(|s| s.as_ref())
            .collect())
    }

    /// Run the requested stages (all default stages if none) for the
    /// context's sample.
    ///
    /// Stops at the first failing stage; nothing after it runs.
    pub fn run(&self, ctx: &Context, names: &[String]) -> PipelineResult<PipelineRunResult> {
        let selected = self.select(names)?;
        let executor = StageExecutor::new(ctx);
        let mut result = PipelineRunResult::default();

        ctx.logger.info(&format!(
            "Processing sample {} ({} stage(s))",
            ctx.sample(),
            selected.len()
        ));

        for stage in selected {
            let stage_name = stage.name();
            ctx.logger.phase(stage_name);

            match executor.run(stage) {
                Ok(StageOutcome::Ran) => {
                    ctx.logger.success(&format!("{} completed", stage_name));
                    result.stages_ran.push(stage_name.to_string());
                }
                Ok(StageOutcome::Cached) => {
                    result.stages_cached.push(stage_name.to_string());
                }
                Err(e) => {
                    ctx.logger.error(&format!("{} failed: {}", stage_name, e));
                    ctx.logger.flush();
                    return Err(PipelineError::stage_failed(ctx.sample(), stage_name, e));
                }
            }
        }

        ctx.logger.success("Pipeline completed successfully");
        ctx.logger.flush();
        Ok(result)
    }

    /// Get the number of stages in the table.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Get stage names in order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineRunResult {
    /// Stages whose commands ran.
    pub stages_ran: Vec<String>,
    /// Stages skipped because their outputs were already valid.
    pub stages_cached: Vec<String>,
}

impl PipelineRunResult {
    /// True when nothing had to run.
    pub fn fully_cached(&self) -> bool {
        self.stages_ran.is_empty()
    }

    /// Total number of stages visited.
    pub fn total_stages(&self) -> usize {
        self.stages_ran.len() + self.stages_cached.len()
    }
}
