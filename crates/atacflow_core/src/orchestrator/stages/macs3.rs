//! Peak calling with MACS3 in paired-end mode.

use std::path::PathBuf;

use crate::cache::Artifact;
use crate::models::AnalysisMode;
use crate::orchestrator::errors::{require_file, StageResult};
use crate::orchestrator::stage::PipelineStage;
use crate::orchestrator::types::Context;
use crate::process::ToolCommand;

pub struct Macs3Stage;

impl Macs3Stage {
    pub fn new() -> Self {
        Self
    }

    /// Filtered BAM of the ChIP background sample, when one applies.
    fn control_bam(ctx: &Context) -> Option<PathBuf> {
        if ctx.mode != AnalysisMode::Chip {
            return None;
        }
        ctx.settings
            .options
            .control_sample
            .as_deref()
            .map(|control| ctx.layout.for_sample(control).filtered_bam())
    }
}

impl Default for Macs3Stage {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStage for Macs3Stage {
    fn name(&self) -> &str {
        "macs3"
    }

    fn expected_outputs(&self, ctx: &Context) -> Vec<Artifact> {
        vec![Artifact::file(ctx.layout.narrow_peak())]
    }

    fn clean_dirs(&self, ctx: &Context) -> Vec<PathBuf> {
        vec![ctx.layout.macs3_dir()]
    }

    fn validate_inputs(&self, ctx: &Context) -> StageResult<()> {
        require_file("filtered BAM", &ctx.layout.filtered_bam())?;
        if let Some(control) = Self::control_bam(ctx) {
            require_file("control filtered BAM", &control)?;
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context) -> StageResult<()> {
        let out = ctx.layout.macs3_dir();
        ctx.ensure_dir(&out)?;

        let mut command = ToolCommand::new("macs3")
            .args(["callpeak", "-f", "BAMPE", "-g", "hs", "--keep-dup", "all", "-n"])
            .arg(ctx.sample())
            .arg("-t")
            .arg(ctx.layout.filtered_bam())
            .arg("--outdir")
            .arg(&out);
        if let Some(control) = Self::control_bam(ctx) {
            command = command.arg("-c").arg(control);
        }
        ctx.run(&command)
    }

    fn description(&self) -> &str {
        "Call peaks with MACS3"
    }
}
