//! Per-sample QC metrics and the cross-sample metrics table.
//!
//! This is the one stage that tolerates bad upstream files: a missing or
//! malformed idxstats, Picard or per-sample metrics file becomes `NA`
//! instead of failing the run.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cache::Artifact;
use crate::models::SampleLayout;
use crate::orchestrator::errors::{require_file, StageError, StageResult};
use crate::orchestrator::selector::list_sample_dirs;
use crate::orchestrator::stage::PipelineStage;
use crate::orchestrator::types::Context;
use crate::process::ToolCommand;

/// Column order of both the per-sample and the aggregate table.
pub const QC_COLUMNS: [&str; 6] = [
    "sample",
    "total_reads_filtered_bam",
    "frip_tss_2kb",
    "frip_peaks_macs3",
    "mito_fraction_mapped",
    "picard_percent_duplication",
];

const NA: &str = "NA";

/// Half-width of the window around each TSS.
const TSS_FLANK: &str = "2000";

const MITO_CONTIGS: [&str; 3] = ["chrM", "MT", "M"];

/// One row of the metrics table. `None` renders as `NA`.
#[derive(Debug, Clone, PartialEq)]
pub struct QcMetrics {
    pub sample: String,
    pub total_reads: Option<u64>,
    pub frip_tss: Option<f64>,
    pub frip_peaks: Option<f64>,
    pub mito_fraction: Option<f64>,
    pub percent_duplication: Option<f64>,
}

impl QcMetrics {
    /// A row with every value absent.
    pub fn absent(sample: impl Into<String>) -> Self {
        Self {
            sample: sample.into(),
            total_reads: None,
            frip_tss: None,
            frip_peaks: None,
            mito_fraction: None,
            percent_duplication: None,
        }
    }

    pub fn header() -> String {
        QC_COLUMNS.join("\t")
    }

    pub fn to_row(&self) -> String {
        [
            self.sample.clone(),
            render(self.total_reads),
            render(self.frip_tss),
            render(self.frip_peaks),
            render(self.mito_fraction),
            render(self.percent_duplication),
        ]
        .join("\t")
    }

    /// Parse a per-sample table (header line + one row).
    ///
    /// Columns are matched by name. Returns `None` if the header or the
    /// row is unusable; individual unparsable values become absent.
    pub fn parse_table(content: &str) -> Option<Self> {
        let mut lines = content.lines().filter(|l| !l.trim().is_empty());
        let header: Vec<&str> = lines.next()?.split('\t').collect();
        let values: Vec<&str> = lines.next()?.split('\t').collect();
        if header.len() != values.len() {
            return None;
        }

        let field = |name: &str| {
            header
                .iter()
                .position(|h| h.trim() == name)
                .map(|i| values[i].trim())
                .filter(|v| !v.is_empty() && *v != NA)
        };

        Some(Self {
            sample: field(QC_COLUMNS[0])?.to_string(),
            total_reads: field(QC_COLUMNS[1]).and_then(|v| v.parse().ok()),
            frip_tss: field(QC_COLUMNS[2]).and_then(|v| v.parse().ok()),
            frip_peaks: field(QC_COLUMNS[3]).and_then(|v| v.parse().ok()),
            mito_fraction: field(QC_COLUMNS[4]).and_then(|v| v.parse().ok()),
            percent_duplication: field(QC_COLUMNS[5]).and_then(|v| v.parse().ok()),
        })
    }

    /// Read a sample's metrics file; absent values if missing or malformed.
    pub fn read_or_absent(path: &Path, sample: &str) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match Self::parse_table(&content) {
                Some(metrics) => metrics,
                None => {
                    tracing::warn!("Malformed QC metrics file {}", path.display());
                    Self::absent(sample)
                }
            },
            Err(_) => Self::absent(sample),
        }
    }
}

fn render<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| NA.to_string(), |v| v.to_string())
}

/// Fraction of mapped reads on mitochondrial contigs, from `samtools idxstats`.
///
/// Returns `None` if any line is malformed or nothing is mapped.
pub fn mito_fraction(idxstats: &str) -> Option<f64> {
    let mut total: u64 = 0;
    let mut mito: u64 = 0;
    for line in idxstats.lines().filter(|l| !l.trim().is_empty()) {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 4 {
            return None;
        }
        let mapped: u64 = cols[2].trim().parse().ok()?;
        total += mapped;
        if MITO_CONTIGS.contains(&cols[0].trim()) {
            mito += mapped;
        }
    }
    (total > 0).then(|| mito as f64 / total as f64)
}

/// `PERCENT_DUPLICATION` from a Picard MarkDuplicates metrics file.
pub fn picard_duplication(metrics: &str) -> Option<f64> {
    let lines: Vec<&str> = metrics
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect();

    let header_idx = lines.iter().position(|l| {
        l.contains("PERCENT_DUPLICATION") && l.contains("UNPAIRED_READS_EXAMINED")
    })?;
    let header: Vec<&str> = lines[header_idx].split('\t').collect();
    let values: Vec<&str> = lines.get(header_idx + 1)?.split('\t').collect();

    let col = header.iter().position(|h| *h == "PERCENT_DUPLICATION")?;
    values.get(col)?.trim().parse().ok()
}

fn fraction(part: u64, total: Option<u64>) -> Option<f64> {
    total.filter(|t| *t > 0).map(|t| part as f64 / t as f64)
}

pub struct QcStage;

impl QcStage {
    pub fn new() -> Self {
        Self
    }

    /// `samtools view -c`
    fn count_reads(ctx: &Context, bam: &Path) -> StageResult<Option<u64>> {
        let mut total = None;
        let command = ToolCommand::new("samtools").args(["view", "-c"]).arg(bam);
        ctx.stream_lines(&command, &mut |line| {
            if total.is_none() {
                total = line.trim().parse::<u64>().ok();
            }
        })?;
        Ok(total)
    }

    /// Reads of `bam` overlapping `regions`, one line per read.
    fn count_overlapping(ctx: &Context, bam: &Path, regions: &Path) -> StageResult<u64> {
        let mut count = 0u64;
        let command = ToolCommand::new("bedtools")
            .args(["intersect", "-u", "-bed", "-abam"])
            .arg(bam)
            .arg("-b")
            .arg(regions);
        ctx.stream_lines(&command, &mut |line| {
            if !line.is_empty() {
                count += 1;
            }
        })?;
        Ok(count)
    }

    /// ±2 kb windows around TSSs, if the annotation is configured.
    fn tss_windows(ctx: &Context) -> StageResult<Option<PathBuf>> {
        let refs = &ctx.settings.references;
        let (tss, sizes) = match (&refs.tss_bed, &refs.genome_sizes) {
            (Some(tss), Some(sizes)) => (tss, sizes),
            _ => {
                ctx.logger
                    .info("tss_bed or genome_sizes not configured; FRiP(TSS) will be NA");
                return Ok(None);
            }
        };

        let out = ctx.layout.tss_windows();
        let slop = ToolCommand::new("bedtools")
            .args(["slop", "-i"])
            .arg(tss)
            .arg("-g")
            .arg(sizes)
            .args(["-b", TSS_FLANK])
            .stdout_to(&out);
        ctx.run(&slop)?;
        Ok(Some(out))
    }

    fn sample_metrics(ctx: &Context) -> StageResult<QcMetrics> {
        let l = &ctx.layout;
        let bam = l.filtered_bam();

        let total_reads = Self::count_reads(ctx, &bam)?;
        let in_peaks = Self::count_overlapping(ctx, &bam, &l.narrow_peak())?;
        let frip_tss = match Self::tss_windows(ctx)? {
            Some(windows) => fraction(Self::count_overlapping(ctx, &bam, &windows)?, total_reads),
            None => None,
        };

        let mito = fs::read_to_string(l.idxstats())
            .ok()
            .and_then(|c| mito_fraction(&c));
        if mito.is_none() {
            ctx.logger.warn("idxstats missing or malformed; mito fraction is NA");
        }

        let duplication = fs::read_to_string(l.markdup_metrics())
            .ok()
            .and_then(|c| picard_duplication(&c));
        if duplication.is_none() {
            ctx.logger.warn("Picard metrics missing or malformed; duplication is NA");
        }

        Ok(QcMetrics {
            sample: ctx.sample().to_string(),
            total_reads,
            frip_tss,
            frip_peaks: fraction(in_peaks, total_reads),
            mito_fraction: mito,
            percent_duplication: duplication,
        })
    }

    /// Rewrite the aggregate table: one row per raw sample of the current
    /// mode plus the current sample.
    fn write_aggregate(ctx: &Context) -> StageResult<PathBuf> {
        let mut samples = list_sample_dirs(&ctx.settings.paths.raw_input_dir, ctx.mode.sample_suffix())
            .map_err(|e| StageError::io("listing raw samples", e))?;
        if !samples.iter().any(|s| s == ctx.sample()) {
            samples.push(ctx.sample().to_string());
            samples.sort();
        }

        let mut table = QcMetrics::header();
        table.push('\n');
        for sample in &samples {
            let layout: SampleLayout = ctx.layout.for_sample(sample.as_str());
            let row = QcMetrics::read_or_absent(&layout.qc_metrics(), sample);
            table.push_str(&row.to_row());
            table.push('\n');
        }

        let out = ctx.layout.aggregate_metrics();
        write_file(&out, &table)?;
        Ok(out)
    }
}

fn write_file(path: &Path, content: &str) -> StageResult<()> {
    fs::write(path, content).map_err(|e| StageError::io(format!("writing {}", path.display()), e))
}

impl Default for QcStage {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStage for QcStage {
    fn name(&self) -> &str {
        "qc"
    }

    fn expected_outputs(&self, ctx: &Context) -> Vec<Artifact> {
        vec![Artifact::file(ctx.layout.qc_metrics())]
    }

    fn clean_dirs(&self, _ctx: &Context) -> Vec<PathBuf> {
        // {qc}/S also holds align_qc's outputs.
        Vec::new()
    }

    fn clean_files(&self, ctx: &Context) -> Vec<PathBuf> {
        vec![ctx.layout.qc_metrics(), ctx.layout.tss_windows()]
    }

    fn validate_inputs(&self, ctx: &Context) -> StageResult<()> {
        require_file("filtered BAM", &ctx.layout.filtered_bam())?;
        require_file("MACS3 peaks", &ctx.layout.narrow_peak())
    }

    fn execute(&self, ctx: &Context) -> StageResult<()> {
        ctx.ensure_dir(&ctx.layout.qc_dir())?;

        let metrics = Self::sample_metrics(ctx)?;
        let out = ctx.layout.qc_metrics();
        write_file(&out, &format!("{}\n{}\n", QcMetrics::header(), metrics.to_row()))?;
        ctx.logger.info(&format!("Wrote QC metrics: {}", out.display()));

        let aggregate = Self::write_aggregate(ctx)?;
        ctx.logger
            .info(&format!("Updated combined QC metrics: {}", aggregate.display()));
        Ok(())
    }

    fn description(&self) -> &str {
        "Per-sample QC metrics and combined table"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PICARD: &str = "## htsjdk.samtools.metrics.StringHeader\n\
# MarkDuplicates INPUT=[S1_align.bam]\n\
\n\
## METRICS CLASS\tpicard.sam.DuplicationMetrics\n\
LIBRARY\tUNPAIRED_READS_EXAMINED\tREAD_PAIRS_EXAMINED\tPERCENT_DUPLICATION\tESTIMATED_LIBRARY_SIZE\n\
lib1\t10\t5000\t0.1234\t90000\n\
\n\
## HISTOGRAM\tjava.lang.Double\n\
BIN\tCoverageMult\n";

    #[test]
    fn parses_picard_duplication() {
        assert_eq!(picard_duplication(PICARD), Some(0.1234));
        assert_eq!(picard_duplication("LIBRARY\tREADS\nlib\t1\n"), None);
        assert_eq!(picard_duplication(""), None);
    }

    #[test]
    fn computes_mito_fraction() {
        let idxstats = "chr1\t1000\t60\t0\nchrM\t16569\t40\t0\n*\t0\t0\t5\n";
        assert_eq!(mito_fraction(idxstats), Some(0.4));
    }

    #[test]
    fn malformed_idxstats_is_absent() {
        assert_eq!(mito_fraction("chr1\t1000\tmany\t0\n"), None);
        assert_eq!(mito_fraction("chr1 1000 60 0\n"), None);
        assert_eq!(mito_fraction("chr1\t1000\t0\t0\n"), None);
    }

    #[test]
    fn absent_values_render_as_na() {
        let mut metrics = QcMetrics::absent("S2_ATAC");
        metrics.total_reads = Some(1000);
        metrics.frip_peaks = Some(0.25);
        assert_eq!(metrics.to_row(), "S2_ATAC\t1000\tNA\t0.25\tNA\tNA");
    }

    #[test]
    fn table_round_trips_through_text() {
        let metrics = QcMetrics {
            sample: "S1_ATAC".to_string(),
            total_reads: Some(2000),
            frip_tss: None,
            frip_peaks: Some(0.3),
            mito_fraction: Some(0.05),
            percent_duplication: Some(0.12),
        };
        let text = format!("{}\n{}\n", QcMetrics::header(), metrics.to_row());
        assert_eq!(QcMetrics::parse_table(&text), Some(metrics));
    }

    #[test]
    fn unreadable_metrics_file_becomes_absent_row() {
        let dir = tempfile::tempdir().unwrap();
        let missing = QcMetrics::read_or_absent(&dir.path().join("nope.tsv"), "S3");
        assert_eq!(missing, QcMetrics::absent("S3"));

        let garbage = dir.path().join("garbage.tsv");
        fs::write(&garbage, "just one line").unwrap();
        assert_eq!(QcMetrics::read_or_absent(&garbage, "S4"), QcMetrics::absent("S4"));
    }

    #[test]
    fn fraction_needs_positive_total() {
        assert_eq!(fraction(5, Some(10)), Some(0.5));
        assert_eq!(fraction(5, Some(0)), None);
        assert_eq!(fraction(5, None), None);
    }
}
