//! FastQC read-quality reports, before or after trimming.
//!
//! Only run on request; a full run leaves them out.

use std::path::{Path, PathBuf};

use crate::cache::Artifact;
use crate::orchestrator::errors::{StageError, StageResult};
use crate::orchestrator::stage::PipelineStage;
use crate::orchestrator::types::Context;
use crate::process::ToolCommand;

use super::list_files;

const FASTQ_EXTENSIONS: [&str; 4] = [".fastq.gz", ".fq.gz", ".fastq", ".fq"];

/// Which reads a FastQC stage looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastqcTarget {
    /// `*.fastq.gz` / `*.fq.gz` in the raw sample directory.
    Raw,
    /// `*_trimmed_R{1,2}.fastq.gz` in the trimmed sample directory.
    Trimmed,
}

pub struct FastqcStage {
    target: FastqcTarget,
}

impl FastqcStage {
    pub fn before_trimming() -> Self {
        Self {
            target: FastqcTarget::Raw,
        }
    }

    pub fn after_trimming() -> Self {
        Self {
            target: FastqcTarget::Trimmed,
        }
    }

    pub fn target(&self) -> FastqcTarget {
        self.target
    }

    fn input_dir(&self, ctx: &Context) -> PathBuf {
        match self.target {
            FastqcTarget::Raw => ctx.layout.raw_dir(),
            FastqcTarget::Trimmed => ctx.layout.trimmed_dir(),
        }
    }

    fn output_dir(&self, ctx: &Context) -> PathBuf {
        match self.target {
            FastqcTarget::Raw => ctx.layout.fastqc_untrimmed_dir(),
            FastqcTarget::Trimmed => ctx.layout.fastqc_trimmed_dir(),
        }
    }

    fn inputs(&self, ctx: &Context) -> StageResult<Vec<PathBuf>> {
        let dir = self.input_dir(ctx);
        match self.target {
            FastqcTarget::Raw => list_files(&dir, |name| {
                name.ends_with(".fastq.gz") || name.ends_with(".fq.gz")
            }),
            FastqcTarget::Trimmed => list_files(&dir, |name| {
                name.ends_with("_trimmed_R1.fastq.gz") || name.ends_with("_trimmed_R2.fastq.gz")
            }),
        }
    }
}

/// FastQC names its reports after the input with the FASTQ extension removed.
fn report_base(input: &Path) -> String {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    FASTQ_EXTENSIONS
        .iter()
        .find_map(|ext| name.strip_suffix(ext))
        .map(str::to_string)
        .unwrap_or(name)
}

impl PipelineStage for FastqcStage {
    fn name(&self) -> &str {
        match self.target {
            FastqcTarget::Raw => "fastqc_before_trimming",
            FastqcTarget::Trimmed => "fastqc_after_trimming",
        }
    }

    fn runs_by_default(&self) -> bool {
        false
    }

    fn expected_outputs(&self, ctx: &Context) -> Vec<Artifact> {
        let out = self.output_dir(ctx);
        // An unreadable input directory yields no outputs, which never counts as cached.
        self.inputs(ctx)
            .unwrap_or_default()
            .iter()
            .flat_map(|input| {
                let base = report_base(input);
                [
                    Artifact::file(out.join(format!("{}_fastqc.html", base))),
                    Artifact::file(out.join(format!("{}_fastqc.zip", base))),
                ]
            })
            .collect()
    }

    fn clean_dirs(&self, ctx: &Context) -> Vec<PathBuf> {
        vec![self.output_dir(ctx)]
    }

    fn validate_inputs(&self, ctx: &Context) -> StageResult<()> {
        if self.inputs(ctx)?.is_empty() {
            let what = match self.target {
                FastqcTarget::Raw => "raw FASTQs",
                FastqcTarget::Trimmed => "trimmed FASTQs",
            };
            return Err(StageError::missing_input(what, self.input_dir(ctx)));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context) -> StageResult<()> {
        let out = self.output_dir(ctx);
        ctx.ensure_dir(&out)?;

        let command = ToolCommand::new("fastqc")
            .arg("-o")
            .arg(&out)
            .arg("-t")
            .arg(ctx.threads().to_string())
            .args(self.inputs(ctx)?);
        ctx.run(&command)
    }

    fn description(&self) -> &str {
        match self.target {
            FastqcTarget::Raw => "FastQC on raw reads",
            FastqcTarget::Trimmed => "FastQC on trimmed reads",
        }
    }
}
