//! ATAC-specific QC (fragment sizes, TSS enrichment) via an R script.
//!
//! The script takes `<bam> <sample> <outdir>`. With `conda_activate` and
//! `conda_env` configured it runs inside that environment through bash.

use std::path::{Path, PathBuf};

use crate::cache::Artifact;
use crate::models::bam_index;
use crate::orchestrator::errors::{require_file, StageResult};
use crate::orchestrator::stage::PipelineStage;
use crate::orchestrator::types::Context;
use crate::process::{shell_quote, ToolCommand};

pub struct AtacSeqQcStage;

impl AtacSeqQcStage {
    pub fn new() -> Self {
        Self
    }

    fn script(ctx: &Context) -> StageResult<&Path> {
        ctx.reference("atacseqqc_script", &ctx.settings.references.atacseqqc_script)
    }

    fn command(ctx: &Context, script: &Path, out_dir: &Path) -> ToolCommand {
        let bam = ctx.layout.filtered_bam();
        let opts = &ctx.settings.options;

        match (&opts.conda_activate, &opts.conda_env) {
            (Some(activate), Some(env)) => {
                let quote = |p: &Path| shell_quote(&p.to_string_lossy());
                ToolCommand::shell(format!(
                    "set -euo pipefail\nsource {} {}\nRscript --vanilla {} {} {} {}\n",
                    quote(activate),
                    shell_quote(env),
                    quote(script),
                    quote(&bam),
                    shell_quote(ctx.sample()),
                    quote(out_dir),
                ))
            }
            _ => ToolCommand::new("Rscript")
                .arg("--vanilla")
                .arg(script)
                .arg(&bam)
                .arg(ctx.sample())
                .arg(out_dir),
        }
    }
}

impl Default for AtacSeqQcStage {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStage for AtacSeqQcStage {
    fn name(&self) -> &str {
        "ATACseqQC"
    }

    fn expected_outputs(&self, ctx: &Context) -> Vec<Artifact> {
        let dir = ctx.layout.atacseqqc_dir();
        let s = ctx.sample();
        let shifted = dir.join(format!("{}_shifted.bam", s));
        let shifted_bai = bam_index(&shifted);
        vec![
            Artifact::file(dir.join(format!("{}_Frag_sizes.png", s))),
            Artifact::file(shifted),
            Artifact::file(shifted_bai),
            Artifact::file(dir.join(format!("{}_TSSE_enrichment_plot.png", s))),
            Artifact::file(dir.join(format!("{}_TSSEscore.txt", s))),
        ]
    }

    fn clean_dirs(&self, ctx: &Context) -> Vec<PathBuf> {
        vec![ctx.layout.atacseqqc_dir()]
    }

    fn validate_inputs(&self, ctx: &Context) -> StageResult<()> {
        let script = Self::script(ctx)?;
        require_file("ATACseqQC script", script)?;
        require_file("filtered BAM", &ctx.layout.filtered_bam())
    }

    fn execute(&self, ctx: &Context) -> StageResult<()> {
        let script = Self::script(ctx)?;
        let out_dir = ctx.layout.atacseqqc_dir();
        ctx.ensure_dir(&out_dir)?;

        ctx.logger
            .info(&format!("ATACseqQC: running for sample={}", ctx.sample()));
        ctx.run(&Self::command(ctx, script, &out_dir))
    }

    fn description(&self) -> &str {
        "ATACseqQC fragment-size and TSS enrichment report"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::Settings;
    use crate::logging::{LogConfig, RunLogger};
    use crate::orchestrator::types::RunOptions;
    use crate::process::ProcessRunner;

    fn context(settings: Settings) -> Context {
        Context::new(
            settings,
            "S1_ATAC",
            &RunOptions::default(),
            Arc::new(ProcessRunner::new()),
            Arc::new(RunLogger::without_file("test", LogConfig::quiet(), None)),
        )
    }

    #[test]
    fn runs_rscript_directly_without_conda() {
        let ctx = context(Settings::default());
        let cmd = AtacSeqQcStage::command(&ctx, Path::new("/s/qc.R"), Path::new("/out"));
        assert!(!cmd.is_shell());
        assert_eq!(cmd.program_name(), "Rscript");
        assert_eq!(cmd.arguments()[0], "--vanilla");
        assert_eq!(cmd.arguments()[3], "S1_ATAC");
    }

    #[test]
    fn activates_conda_env_through_bash() {
        let mut settings = Settings::default();
        settings.options.conda_activate = Some(PathBuf::from("/opt/conda/bin/activate"));
        settings.options.conda_env = Some("atac qc".to_string());
        let ctx = context(settings);

        let cmd = AtacSeqQcStage::command(&ctx, Path::new("/s/qc.R"), Path::new("/out"));
        assert!(cmd.is_shell());
        let rendered = cmd.render();
        assert!(rendered.contains("set -euo pipefail"));
        assert!(rendered.contains("source /opt/conda/bin/activate"));
        assert!(rendered.contains("Rscript --vanilla /s/qc.R"));
    }
}
