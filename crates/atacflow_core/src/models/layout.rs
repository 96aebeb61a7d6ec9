//! On-disk layout of one sample across all stage roots.
//!
//! Every stage root holds one directory per sample, and files inside it are
//! named `{sample}_{suffix}.{ext}`. Stages and external tools both rely on
//! this convention, so it lives in one place.

use std::path::{Path, PathBuf};

use crate::config::Settings;

/// Name of the cross-sample metrics table in the QC root.
pub const AGGREGATE_METRICS_FILE: &str = "qc_metrics_all_samples.tsv";

/// Name of the MultiQC output directory in the QC root.
pub const MULTIQC_DIR: &str = "multiqc";

/// Paths for one sample.
#[derive(Debug, Clone)]
pub struct SampleLayout {
    sample: String,
    raw_root: PathBuf,
    trimmed_root: PathBuf,
    reads_quality_root: PathBuf,
    fastqc_untrimmed_root: PathBuf,
    fastqc_trimmed_root: PathBuf,
    aligned_root: PathBuf,
    dedup_root: PathBuf,
    cleaned_root: PathBuf,
    coverage_root: PathBuf,
    macs3_root: PathBuf,
    qc_root: PathBuf,
    atacseqqc_root: Option<PathBuf>,
}

impl SampleLayout {
    pub fn new(settings: &Settings, sample: impl Into<String>) -> Self {
        let paths = &settings.paths;
        Self {
            sample: sample.into(),
            raw_root: paths.raw_input_dir.clone(),
            trimmed_root: paths.trimmed_dir.clone(),
            reads_quality_root: paths.reads_quality_dir.clone(),
            fastqc_untrimmed_root: paths.fastqc_untrimmed_dir.clone(),
            fastqc_trimmed_root: paths.fastqc_trimmed_dir.clone(),
            aligned_root: paths.aligned_dir.clone(),
            dedup_root: paths.dedup_alignments_dir.clone(),
            cleaned_root: paths.cleaned_alignments_dir.clone(),
            coverage_root: paths.coverages_dir.clone(),
            macs3_root: paths.macs3_dir.clone(),
            qc_root: paths.other_qc_dir.clone(),
            atacseqqc_root: settings.options.atacseqqc_dir.clone(),
        }
    }

    pub fn sample(&self) -> &str {
        &self.sample
    }

    /// `{dir}/{sample}{suffix}`
    fn file(&self, dir: PathBuf, suffix: &str) -> PathBuf {
        dir.join(format!("{}{}", self.sample, suffix))
    }

    // Per-sample directories

    pub fn raw_dir(&self) -> PathBuf {
        self.raw_root.join(&self.sample)
    }

    pub fn trimmed_dir(&self) -> PathBuf {
        self.trimmed_root.join(&self.sample)
    }

    pub fn reads_quality_dir(&self) -> PathBuf {
        self.reads_quality_root.join(&self.sample)
    }

    pub fn fastqc_untrimmed_dir(&self) -> PathBuf {
        self.fastqc_untrimmed_root.join(&self.sample)
    }

    pub fn fastqc_trimmed_dir(&self) -> PathBuf {
        self.fastqc_trimmed_root.join(&self.sample)
    }

    pub fn aligned_dir(&self) -> PathBuf {
        self.aligned_root.join(&self.sample)
    }

    pub fn dedup_dir(&self) -> PathBuf {
        self.dedup_root.join(&self.sample)
    }

    pub fn cleaned_dir(&self) -> PathBuf {
        self.cleaned_root.join(&self.sample)
    }

    pub fn coverage_dir(&self) -> PathBuf {
        self.coverage_root.join(&self.sample)
    }

    pub fn macs3_dir(&self) -> PathBuf {
        self.macs3_root.join(&self.sample)
    }

    pub fn qc_dir(&self) -> PathBuf {
        self.qc_root.join(&self.sample)
    }

    pub fn atacseqqc_dir(&self) -> PathBuf {
        match self.atacseqqc_root {
            Some(ref root) => root.join(&self.sample),
            None => self.qc_dir().join("ATACseqQC"),
        }
    }

    // Shared directories

    pub fn qc_root(&self) -> &Path {
        &self.qc_root
    }

    pub fn multiqc_dir(&self) -> PathBuf {
        self.qc_root.join(MULTIQC_DIR)
    }

    pub fn aggregate_metrics(&self) -> PathBuf {
        self.qc_root.join(AGGREGATE_METRICS_FILE)
    }

    // trimming

    pub fn trimmed_r1(&self) -> PathBuf {
        self.file(self.trimmed_dir(), "_trimmed_R1.fastq.gz")
    }

    pub fn trimmed_r2(&self) -> PathBuf {
        self.file(self.trimmed_dir(), "_trimmed_R2.fastq.gz")
    }

    pub fn merged_r1(&self) -> PathBuf {
        self.file(self.trimmed_dir(), "_merged_R1.fastq.gz")
    }

    pub fn merged_r2(&self) -> PathBuf {
        self.file(self.trimmed_dir(), "_merged_R2.fastq.gz")
    }

    pub fn fastp_html(&self) -> PathBuf {
        self.file(self.reads_quality_dir(), ".fastp.html")
    }

    pub fn fastp_json(&self) -> PathBuf {
        self.file(self.reads_quality_dir(), ".fastp.json")
    }

    // align

    pub fn align_bam(&self) -> PathBuf {
        self.file(self.aligned_dir(), "_align.bam")
    }

    // align_qc

    pub fn dedup_bam(&self) -> PathBuf {
        self.file(self.dedup_dir(), "_align_dedup.bam")
    }

    /// Index name Picard writes with `CREATE_INDEX=true`.
    pub fn picard_dedup_index(&self) -> PathBuf {
        self.file(self.dedup_dir(), "_align_dedup.bai")
    }

    pub fn markdup_metrics(&self) -> PathBuf {
        self.file(self.qc_dir(), "_markdup_qc.txt")
    }

    pub fn alignment_metrics(&self) -> PathBuf {
        self.file(self.qc_dir(), "_alignment_metrics_qc.txt")
    }

    pub fn idxstats(&self) -> PathBuf {
        self.file(self.qc_dir(), "_idxstats.txt")
    }

    pub fn fragment_lengths(&self) -> PathBuf {
        self.file(self.qc_dir(), "_fragment_length_count.txt")
    }

    // filter

    pub fn filtered_bam(&self) -> PathBuf {
        self.file(self.cleaned_dir(), "_align_dedup_filtered.bam")
    }

    /// Blacklist-filtered but not yet sorted; removed after sorting.
    pub fn unsorted_filtered_bam(&self) -> PathBuf {
        self.file(self.cleaned_dir(), "_align_dedup_filtered.unsorted.bam")
    }

    // coverage / peaks / qc

    pub fn coverage_bigwig(&self) -> PathBuf {
        self.file(self.coverage_dir(), "_coverage.bw")
    }

    pub fn narrow_peak(&self) -> PathBuf {
        self.file(self.macs3_dir(), "_peaks.narrowPeak")
    }

    pub fn qc_metrics(&self) -> PathBuf {
        self.file(self.qc_dir(), "_qc_metrics.tsv")
    }

    pub fn tss_windows(&self) -> PathBuf {
        self.file(self.qc_dir(), "_tss_2kb.bed")
    }

    /// The same layout for another sample (e.g. a ChIP control).
    pub fn for_sample(&self, sample: impl Into<String>) -> Self {
        Self {
            sample: sample.into(),
            ..self.clone()
        }
    }
}

/// `{path}.bai`
pub fn bam_index(bam: &Path) -> PathBuf {
    let mut name = bam.as_os_str().to_os_string();
    name.push(".bai");
    PathBuf::from(name)
}
