//! Adapter and quality trimming with fastp.
//!
//! Lanes are concatenated first when a sample has more than one R1/R2 pair.

use std::path::PathBuf;

use crate::cache::Artifact;
use crate::orchestrator::errors::{StageError, StageResult};
use crate::orchestrator::stage::PipelineStage;
use crate::orchestrator::types::Context;
use crate::process::ToolCommand;

use super::list_files;

/// Tn5 adapter used by the library preparation.
pub const TN5_ADAPTER: &str = "AGATGTGTATAAGAGACAG";

/// Reads shorter than this after trimming are dropped.
const MIN_READ_LENGTH: u32 = 30;

/// Raw read files of one sample, split by mate.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RawReads {
    r1: Vec<PathBuf>,
    r2: Vec<PathBuf>,
}

fn is_mate(name: &str, mate: char) -> bool {
    name.ends_with(&format!("{}.fq.gz", mate)) || name.ends_with(&format!("{}.fastq.gz", mate))
}

fn raw_reads(ctx: &Context) -> StageResult<RawReads> {
    let dir = ctx.layout.raw_dir();
    let files = list_files(&dir, |name| name.ends_with(".gz"))?;
    if files.is_empty() {
        return Err(StageError::missing_input("raw FASTQs", dir));
    }

    let pick = |mate: char| -> Vec<PathBuf> {
        files
            .iter()
            .filter(|p| p.file_name().and_then(|n| n.to_str()).is_some_and(|n| is_mate(n, mate)))
            .cloned()
            .collect()
    };
    let reads = RawReads {
        r1: pick('1'),
        r2: pick('2'),
    };

    if reads.r1.is_empty() {
        return Err(StageError::missing_input("R1 reads (*1.fastq.gz / *1.fq.gz)", dir));
    }
    if reads.r2.is_empty() {
        return Err(StageError::missing_input("R2 reads (*2.fastq.gz / *2.fq.gz)", dir));
    }
    if reads.r1.len() != reads.r2.len() {
        return Err(StageError::invalid_input(format!(
            "{} R1 files but {} R2 files in {}",
            reads.r1.len(),
            reads.r2.len(),
            dir.display()
        )));
    }
    Ok(reads)
}

pub struct TrimmingStage;

impl TrimmingStage {
    pub fn new() -> Self {
        Self
    }

    /// Single lane: the raw file. Several lanes: `cat` them into `merged`.
    fn lane_input(ctx: &Context, files: &[PathBuf], merged: PathBuf) -> StageResult<PathBuf> {
        if let [single] = files {
            return Ok(single.clone());
        }
        ctx.logger
            .info(&format!("Merging {} lanes into {}", files.len(), merged.display()));
        ctx.run(&ToolCommand::new("cat").args(files).stdout_to(&merged))?;
        Ok(merged)
    }
}

impl Default for TrimmingStage {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStage for TrimmingStage {
    fn name(&self) -> &str {
        "trimming"
    }

    fn expected_outputs(&self, ctx: &Context) -> Vec<Artifact> {
        let l = &ctx.layout;
        vec![
            Artifact::file(l.trimmed_r1()),
            Artifact::file(l.trimmed_r2()),
            Artifact::file(l.fastp_html()),
            Artifact::file(l.fastp_json()),
        ]
    }

    fn clean_dirs(&self, ctx: &Context) -> Vec<PathBuf> {
        vec![ctx.layout.trimmed_dir(), ctx.layout.reads_quality_dir()]
    }

    fn validate_inputs(&self, ctx: &Context) -> StageResult<()> {
        raw_reads(ctx).map(|_| ())
    }

    fn execute(&self, ctx: &Context) -> StageResult<()> {
        let l = &ctx.layout;
        ctx.ensure_dir(&l.trimmed_dir())?;
        ctx.ensure_dir(&l.reads_quality_dir())?;

        let reads = raw_reads(ctx)?;
        ctx.logger.info(&format!(
            "Found {} lane(s) for sample {}",
            reads.r1.len(),
            ctx.sample()
        ));

        let input_r1 = Self::lane_input(ctx, &reads.r1, l.merged_r1())?;
        let input_r2 = Self::lane_input(ctx, &reads.r2, l.merged_r2())?;

        let command = ToolCommand::new("fastp")
            .arg("-i")
            .arg(&input_r1)
            .arg("-I")
            .arg(&input_r2)
            .arg("-o")
            .arg(l.trimmed_r1())
            .arg("-O")
            .arg(l.trimmed_r2())
            .arg("-w")
            .arg(ctx.threads().to_string())
            .arg("-h")
            .arg(l.fastp_html())
            .arg("-j")
            .arg(l.fastp_json())
            .arg("-R")
            .arg(ctx.sample())
            .arg("-p")
            .arg(format!("--adapter_sequence={}", TN5_ADAPTER))
            .arg(format!("--adapter_sequence_r2={}", TN5_ADAPTER))
            .arg("--trim_poly_g")
            .arg("--trim_poly_x")
            .arg(format!("--length_required={}", MIN_READ_LENGTH));
        ctx.run(&command)
    }

    fn description(&self) -> &str {
        "Trim adapters and low-quality bases with fastp"
    }
}
