//! MultiQC report across every QC output root.

use std::path::PathBuf;

use crate::cache::Artifact;
use crate::orchestrator::errors::StageResult;
use crate::orchestrator::stage::PipelineStage;
use crate::orchestrator::types::Context;
use crate::process::ToolCommand;

pub const REPORT_NAME: &str = "multiqc_report.html";

pub struct MultiqcStage;

impl MultiqcStage {
    pub fn new() -> Self {
        Self
    }

    /// Roots MultiQC scans, limited to the ones that exist.
    fn scan_dirs(ctx: &Context) -> Vec<PathBuf> {
        let paths = &ctx.settings.paths;
        [
            &paths.reads_quality_dir,
            &paths.fastqc_untrimmed_dir,
            &paths.fastqc_trimmed_dir,
            &paths.other_qc_dir,
            &paths.macs3_dir,
        ]
        .into_iter()
        .filter(|d| d.is_dir())
        .cloned()
        .collect()
    }
}

impl Default for MultiqcStage {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStage for MultiqcStage {
    fn name(&self) -> &str {
        "multiqc"
    }

    fn expected_outputs(&self, ctx: &Context) -> Vec<Artifact> {
        vec![Artifact::file(ctx.layout.multiqc_dir().join(REPORT_NAME))]
    }

    fn clean_dirs(&self, ctx: &Context) -> Vec<PathBuf> {
        vec![ctx.layout.multiqc_dir()]
    }

    fn validate_inputs(&self, _ctx: &Context) -> StageResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context) -> StageResult<()> {
        let out = ctx.layout.multiqc_dir();
        ctx.ensure_dir(&out)?;

        let scan = Self::scan_dirs(ctx);
        if scan.is_empty() {
            ctx.logger.warn("multiqc: none of the QC directories exist yet");
        }

        let mut command = ToolCommand::new("multiqc").arg("-o").arg(&out);
        if ctx.force() {
            command = command.arg("-f");
        }
        ctx.run(&command.args(scan))
    }

    fn description(&self) -> &str {
        "Aggregate QC reports with MultiQC"
    }
}
