//! Settings struct with TOML-based sections.
//!
//! The file has three tables: `[paths]` for the per-stage output roots,
//! `[references]` for genome/tool reference files and `[options]` for
//! scalar knobs. Every field is optional in the file; missing fields take
//! the defaults below. Relative paths are resolved against the directory
//! holding the config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::manager::{ConfigError, ConfigResult};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Stage output roots.
    pub paths: PathSettings,
    /// Reference files used by individual stages.
    pub references: ReferenceSettings,
    /// Scalar options.
    pub options: OptionSettings,
}

/// Root directories. Each holds one subdirectory per sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathSettings {
    /// Raw FASTQ input, one directory per sample.
    pub raw_input_dir: PathBuf,
    /// Trimmed FASTQs.
    pub trimmed_dir: PathBuf,
    /// Sorted, indexed alignments.
    pub aligned_dir: PathBuf,
    /// fastp HTML/JSON reports.
    pub reads_quality_dir: PathBuf,
    /// Duplicate-removed alignments.
    pub dedup_alignments_dir: PathBuf,
    /// Filtered alignments. Also the terminal directory used to decide
    /// whether a sample has been picked up already.
    pub cleaned_alignments_dir: PathBuf,
    /// MACS3 peak calls.
    pub macs3_dir: PathBuf,
    /// bigWig coverage tracks.
    pub coverages_dir: PathBuf,
    /// Per-sample QC metrics and the cross-sample tables.
    pub other_qc_dir: PathBuf,
    /// FastQC on raw reads.
    pub fastqc_untrimmed_dir: PathBuf,
    /// FastQC on trimmed reads.
    pub fastqc_trimmed_dir: PathBuf,
    /// Run logs.
    pub logs_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        let data = PathBuf::from("data");
        let output = data.join("output");
        Self {
            raw_input_dir: data.join("raw"),
            trimmed_dir: data.join("temp_trimming"),
            aligned_dir: output.join("temp_align"),
            reads_quality_dir: output.join("fastqc"),
            dedup_alignments_dir: output.join("temp_align_dedup"),
            cleaned_alignments_dir: output.join("clean_alignments"),
            macs3_dir: output.join("macs3"),
            coverages_dir: output.join("coverages"),
            other_qc_dir: output.join("qc"),
            fastqc_untrimmed_dir: output.join("qc").join("fastqc_untrimmed"),
            fastqc_trimmed_dir: output.join("qc").join("fastqc_trimmed"),
            logs_dir: data.join("logs"),
        }
    }
}

impl PathSettings {
    fn paths_mut(&mut self) -> [&mut PathBuf; 12] {
        [
            &mut self.raw_input_dir,
            &mut self.trimmed_dir,
            &mut self.aligned_dir,
            &mut self.reads_quality_dir,
            &mut self.dedup_alignments_dir,
            &mut self.cleaned_alignments_dir,
            &mut self.macs3_dir,
            &mut self.coverages_dir,
            &mut self.other_qc_dir,
            &mut self.fastqc_untrimmed_dir,
            &mut self.fastqc_trimmed_dir,
            &mut self.logs_dir,
        ]
    }
}

/// Reference files. Left unset by default; only the stages that need a
/// reference fail when it is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReferenceSettings {
    /// bowtie2 index prefix.
    pub bowtie2_index: Option<PathBuf>,
    /// Genome FASTA for Picard alignment metrics.
    pub genome_fasta: Option<PathBuf>,
    /// picard.jar.
    pub picard_jar: Option<PathBuf>,
    /// Protein-coding TSS sites (BED) for FRiP around TSS.
    pub tss_bed: Option<PathBuf>,
    /// Chromosome sizes file for `bedtools slop`.
    pub genome_sizes: Option<PathBuf>,
    /// R script driving ATACseqQC.
    pub atacseqqc_script: Option<PathBuf>,
}

impl ReferenceSettings {
    fn paths_mut(&mut self) -> [&mut Option<PathBuf>; 6] {
        [
            &mut self.bowtie2_index,
            &mut self.genome_fasta,
            &mut self.picard_jar,
            &mut self.tss_bed,
            &mut self.genome_sizes,
            &mut self.atacseqqc_script,
        ]
    }
}

/// Scalar options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionSettings {
    /// Thread count forwarded to tools (default 8).
    pub threads: usize,
    /// Exclusion regions (BED or BED.GZ) removed by the filter stage.
    pub blacklist_bed: Option<PathBuf>,
    /// Root for ATACseqQC output; defaults to `{other_qc_dir}/{sample}/ATACseqQC`.
    pub atacseqqc_dir: Option<PathBuf>,
    /// conda `activate` script used to run the R QC script.
    pub conda_activate: Option<PathBuf>,
    /// Environment (name or prefix path) passed to `activate`.
    pub conda_env: Option<String>,
    /// ChIP input/background sample used as MACS3 control.
    pub control_sample: Option<String>,
}

impl Default for OptionSettings {
    fn default() -> Self {
        Self {
            threads: 8,
            blacklist_bed: None,
            atacseqqc_dir: None,
            conda_activate: None,
            conda_env: None,
            control_sample: None,
        }
    }
}

impl Settings {
    /// Make every relative path absolute against `base_dir`, expanding `~/`.
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        for path in self.paths.paths_mut() {
            *path = resolve_path(path, base_dir);
        }
        for path in self.references.paths_mut().into_iter().flatten() {
            *path = resolve_path(path, base_dir);
        }
        for path in [
            &mut self.options.blacklist_bed,
            &mut self.options.atacseqqc_dir,
            &mut self.options.conda_activate,
        ]
        .into_iter()
        .flatten()
        {
            *path = resolve_path(path, base_dir);
        }
    }

    /// Check cross-field constraints once, at load time.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.options.threads == 0 {
            return Err(ConfigError::invalid("options.threads", "must be at least 1"));
        }

        match (&self.options.conda_activate, &self.options.conda_env) {
            (Some(_), None) => {
                return Err(ConfigError::invalid(
                    "options.conda_env",
                    "required when options.conda_activate is set",
                ))
            }
            (None, Some(_)) => {
                return Err(ConfigError::invalid(
                    "options.conda_activate",
                    "required when options.conda_env is set",
                ))
            }
            _ => {}
        }

        if let Some(ref control) = self.options.control_sample {
            if control.trim().is_empty() || control.contains('/') {
                return Err(ConfigError::invalid(
                    "options.control_sample",
                    "must be a bare sample directory name",
                ));
            }
        }

        Ok(())
    }
}

/// Expand `~/` and anchor relative paths at `base_dir`.
fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    };

    if expanded.is_absolute() {
        expanded
    } else {
        normalize(&base_dir.join(expanded))
    }
}

/// Drop `.` components and fold `..` lexically.
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
