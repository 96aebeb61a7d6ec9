//! BigWig coverage track with deepTools `bamCoverage`.

use std::path::PathBuf;

use crate::cache::Artifact;
use crate::orchestrator::errors::{require_file, StageResult};
use crate::orchestrator::stage::PipelineStage;
use crate::orchestrator::types::Context;
use crate::process::ToolCommand;

use super::filter::{EXCLUDE_FLAGS, MIN_MAPQ, REQUIRE_FLAGS};

pub struct CoverageStage;

impl CoverageStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CoverageStage {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStage for CoverageStage {
    fn name(&self) -> &str {
        "coverage"
    }

    fn expected_outputs(&self, ctx: &Context) -> Vec<Artifact> {
        vec![Artifact::file(ctx.layout.coverage_bigwig())]
    }

    fn clean_dirs(&self, ctx: &Context) -> Vec<PathBuf> {
        vec![ctx.layout.coverage_dir()]
    }

    fn validate_inputs(&self, ctx: &Context) -> StageResult<()> {
        require_file("filtered BAM", &ctx.layout.filtered_bam())
    }

    fn execute(&self, ctx: &Context) -> StageResult<()> {
        ctx.ensure_dir(&ctx.layout.coverage_dir())?;

        let command = ToolCommand::new("bamCoverage")
            .arg("-p")
            .arg(ctx.threads().to_string())
            .arg("-b")
            .arg(ctx.layout.filtered_bam())
            .args(["-of", "bigwig", "-o"])
            .arg(ctx.layout.coverage_bigwig())
            .args(["--samFlagInclude", REQUIRE_FLAGS])
            .args(["--samFlagExclude", EXCLUDE_FLAGS])
            .args(["--minMappingQuality", MIN_MAPQ]);
        ctx.run(&command)
    }

    fn description(&self) -> &str {
        "Coverage track (bigWig)"
    }
}
