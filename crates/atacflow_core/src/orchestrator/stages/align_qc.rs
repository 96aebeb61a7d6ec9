//! Duplicate removal and alignment metrics.
//!
//! Picard removes duplicates and collects summary metrics; samtools gives
//! per-contig counts; the fragment-length histogram is built here from the
//! TLEN column of `samtools view`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cache::Artifact;
use crate::models::bam_index;
use crate::orchestrator::errors::{require_file, StageError, StageResult};
use crate::orchestrator::stage::PipelineStage;
use crate::orchestrator::types::Context;
use crate::process::ToolCommand;

use super::samtools_index;

/// Upper bound for Picard's garbage-collector threads.
const MAX_PICARD_GC_THREADS: usize = 4;

const PICARD_HEAP: &str = "-Xmx8G";

/// Fragment length → read count, for properly oriented pairs (TLEN > 0).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FragmentHistogram {
    counts: BTreeMap<u64, u64>,
}

impl FragmentHistogram {
    /// Count one SAM record. Lines without a positive TLEN are ignored.
    pub fn add_sam_line(&mut self, line: &str) {
        let tlen = line.split('\t').nth(8).and_then(|f| f.trim().parse::<i64>().ok());
        if let Some(tlen) = tlen.filter(|t| *t > 0) {
            *self.counts.entry(tlen as u64).or_insert(0) += 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// `"<count> <length>"` per line, ascending by length.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (length, count) in &self.counts {
            out.push_str(&format!("{} {}\n", count, length));
        }
        out
    }
}

pub struct AlignQcStage;

impl AlignQcStage {
    pub fn new() -> Self {
        Self
    }

    fn picard(ctx: &Context, jar: &Path, tool: &str) -> ToolCommand {
        let gc_threads = ctx.threads().min(MAX_PICARD_GC_THREADS);
        ToolCommand::new("java")
            .arg(format!("-XX:ParallelGCThreads={}", gc_threads))
            .arg(PICARD_HEAP)
            .arg("-jar")
            .arg(jar)
            .arg(tool)
    }

    /// Picard writes `S_align_dedup.bai`; downstream tools look for `.bam.bai`.
    fn normalize_index(ctx: &Context) -> StageResult<()> {
        let picard_index = ctx.layout.picard_dedup_index();
        let dedup = ctx.layout.dedup_bam();
        let wanted = bam_index(&dedup);

        if picard_index.is_file() {
            fs::rename(&picard_index, &wanted).map_err(|e| {
                StageError::io(format!("renaming {}", picard_index.display()), e)
            })?;
        } else if !wanted.is_file() {
            ctx.logger.warn("Picard did not write an index; indexing with samtools");
            samtools_index(ctx, &dedup)?;
        }
        Ok(())
    }

    fn fragment_lengths(ctx: &Context) -> StageResult<()> {
        let mut histogram = FragmentHistogram::default();
        let view = ToolCommand::new("samtools").arg("view").arg(ctx.layout.dedup_bam());
        ctx.stream_lines(&view, &mut |line| histogram.add_sam_line(line))?;

        if histogram.is_empty() {
            ctx.logger.warn("No properly paired fragments found for the length histogram");
        }

        let out = ctx.layout.fragment_lengths();
        fs::write(&out, histogram.render())
            .map_err(|e| StageError::io(format!("writing {}", out.display()), e))
    }
}

impl Default for AlignQcStage {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStage for AlignQcStage {
    fn name(&self) -> &str {
        "align_qc"
    }

    fn expected_outputs(&self, ctx: &Context) -> Vec<Artifact> {
        let l = &ctx.layout;
        let dedup = l.dedup_bam();
        let dedup_bai = bam_index(&dedup);
        vec![
            Artifact::file(dedup),
            Artifact::file(dedup_bai),
            Artifact::file(l.markdup_metrics()),
            Artifact::file(l.alignment_metrics()),
            Artifact::file(l.idxstats()),
            Artifact::file(l.fragment_lengths()),
        ]
    }

    fn clean_dirs(&self, ctx: &Context) -> Vec<PathBuf> {
        vec![ctx.layout.dedup_dir(), ctx.layout.qc_dir()]
    }

    fn validate_inputs(&self, ctx: &Context) -> StageResult<()> {
        let refs = &ctx.settings.references;
        ctx.reference("picard_jar", &refs.picard_jar)?;
        ctx.reference("genome_fasta", &refs.genome_fasta)?;
        require_file("aligned BAM", &ctx.layout.align_bam())
    }

    fn execute(&self, ctx: &Context) -> StageResult<()> {
        let refs = &ctx.settings.references;
        let jar = ctx.reference("picard_jar", &refs.picard_jar)?;
        let fasta = ctx.reference("genome_fasta", &refs.genome_fasta)?;
        let l = &ctx.layout;

        ctx.ensure_dir(&l.dedup_dir())?;
        ctx.ensure_dir(&l.qc_dir())?;

        let dedup = l.dedup_bam();

        ctx.logger.info("Running Picard MarkDuplicates");
        let mark_duplicates = Self::picard(ctx, jar, "MarkDuplicates")
            .args(["QUIET=true", "REMOVE_DUPLICATES=true", "CREATE_INDEX=true"])
            .arg(format!("I={}", l.align_bam().display()))
            .arg(format!("O={}", dedup.display()))
            .arg(format!("M={}", l.markdup_metrics().display()));
        ctx.run(&mark_duplicates)?;
        Self::normalize_index(ctx)?;

        ctx.logger.info("Running Picard CollectAlignmentSummaryMetrics");
        let summary = Self::picard(ctx, jar, "CollectAlignmentSummaryMetrics")
            .arg(format!("R={}", fasta.display()))
            .arg(format!("I={}", dedup.display()))
            .arg(format!("O={}", l.alignment_metrics().display()));
        ctx.run(&summary)?;

        let idxstats = ToolCommand::new("samtools")
            .arg("idxstats")
            .arg(&dedup)
            .stdout_to(l.idxstats());
        ctx.run(&idxstats)?;

        ctx.logger.info("Computing fragment length counts");
        Self::fragment_lengths(ctx)
    }

    fn description(&self) -> &str {
        "Remove duplicates and collect alignment metrics"
    }
}
