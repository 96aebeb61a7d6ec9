//! Paired-end alignment with bowtie2, sorted and indexed.

use std::path::PathBuf;

use crate::cache::Artifact;
use crate::models::bam_index;
use crate::orchestrator::errors::StageResult;
use crate::orchestrator::stage::PipelineStage;
use crate::orchestrator::types::Context;
use crate::process::ToolCommand;

use super::{samtools_index, single_match};

const TRIMMED_R1_SUFFIX: &str = "trimmed_R1.fastq.gz";
const TRIMMED_R2_SUFFIX: &str = "trimmed_R2.fastq.gz";

/// Maximum fragment length bowtie2 accepts as a valid pair.
const MAX_FRAGMENT_LENGTH: u32 = 2000;

pub struct AlignStage;

impl AlignStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AlignStage {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStage for AlignStage {
    fn name(&self) -> &str {
        "align"
    }

    fn expected_outputs(&self, ctx: &Context) -> Vec<Artifact> {
        let bam = ctx.layout.align_bam();
        let bai = bam_index(&bam);
        vec![Artifact::file(bam), Artifact::file(bai)]
    }

    fn clean_dirs(&self, ctx: &Context) -> Vec<PathBuf> {
        vec![ctx.layout.aligned_dir()]
    }

    fn validate_inputs(&self, ctx: &Context) -> StageResult<()> {
        ctx.reference("bowtie2_index", &ctx.settings.references.bowtie2_index)?;
        let trimmed = ctx.layout.trimmed_dir();
        single_match(&trimmed, TRIMMED_R1_SUFFIX)?;
        single_match(&trimmed, TRIMMED_R2_SUFFIX)?;
        Ok(())
    }

    fn execute(&self, ctx: &Context) -> StageResult<()> {
        let index = ctx.reference("bowtie2_index", &ctx.settings.references.bowtie2_index)?;
        let trimmed = ctx.layout.trimmed_dir();
        let r1 = single_match(&trimmed, TRIMMED_R1_SUFFIX)?;
        let r2 = single_match(&trimmed, TRIMMED_R2_SUFFIX)?;

        ctx.ensure_dir(&ctx.layout.aligned_dir())?;
        let bam = ctx.layout.align_bam();
        let threads = ctx.threads().to_string();

        let bowtie2 = ToolCommand::new("bowtie2")
            .args(["--very-sensitive", "-k", "1", "-X"])
            .arg(MAX_FRAGMENT_LENGTH.to_string())
            .arg("-x")
            .arg(index)
            .arg("-1")
            .arg(&r1)
            .arg("-2")
            .arg(&r2)
            .arg("-p")
            .arg(&threads);
        let sort = ToolCommand::new("samtools")
            .args(["sort", "-@"])
            .arg(&threads)
            .arg("-o")
            .arg(&bam)
            .arg("-");

        ctx.run_pipe(&bowtie2, &sort)?;
        samtools_index(ctx, &bam)
    }

    fn description(&self) -> &str {
        "Align trimmed reads with bowtie2 and sort with samtools"
    }
}
