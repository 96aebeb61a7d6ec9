//! Concrete pipeline stages, one module per stage.
//!
//! Table order (dependency order):
//! fastqc_before_trimming, trimming, fastqc_after_trimming, align, align_qc,
//! filter, coverage, macs3, qc, ATACseqQC, multiqc

mod align;
mod align_qc;
mod atacseqqc;
mod coverage;
mod fastqc;
mod filter;
mod macs3;
mod multiqc;
mod qc;
mod trimming;

pub use align::AlignStage;
pub use align_qc::{AlignQcStage, FragmentHistogram};
pub use atacseqqc::AtacSeqQcStage;
pub use coverage::CoverageStage;
pub use fastqc::{FastqcStage, FastqcTarget};
pub use filter::FilterStage;
pub use macs3::Macs3Stage;
pub use multiqc::MultiqcStage;
pub use qc::{QcMetrics, QcStage, QC_COLUMNS};
pub use trimming::TrimmingStage;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::process::ToolCommand;

use super::errors::{StageError, StageResult};
use super::types::Context;

/// Sorted files in `dir` whose names satisfy `keep`. A missing `dir` is empty.
pub(crate) fn list_files(dir: &Path, keep: impl Fn(&str) -> bool) -> StageResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StageError::io(format!("listing {}", dir.display()), e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StageError::io(format!("listing {}", dir.display()), e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if entry.file_name().to_str().is_some_and(&keep) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// The one file in `dir` whose name ends with `suffix`.
///
/// None is `MissingInput`; more than one is `AmbiguousInput`.
pub(crate) fn single_match(dir: &Path, suffix: &str) -> StageResult<PathBuf> {
    let mut matches = list_files(dir, |name| name.ends_with(suffix))?;
    match matches.len() {
        0 => Err(StageError::missing_input(
            format!("file matching '*{}'", suffix),
            dir,
        )),
        1 => Ok(matches.remove(0)),
        _ => Err(StageError::ambiguous_input(format!("*{}", suffix), matches)),
    }
}

/// `samtools index <bam>`
pub(crate) fn samtools_index(ctx: &Context, bam: &Path) -> StageResult<()> {
    ctx.run(&ToolCommand::new("samtools").arg("index").arg(bam))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn single_match_requires_exactly_one() {
        let dir = tempdir().unwrap();
        let suffix = "trimmed_R1.fastq.gz";

        let err = single_match(dir.path(), suffix).unwrap_err();
        assert!(matches!(err, StageError::MissingInput { .. }));

        fs::write(dir.path().join("S1_trimmed_R1.fastq.gz"), "r1").unwrap();
        fs::write(dir.path().join("S1_trimmed_R2.fastq.gz"), "r2").unwrap();
        assert_eq!(
            single_match(dir.path(), suffix).unwrap(),
            dir.path().join("S1_trimmed_R1.fastq.gz")
        );

        fs::write(dir.path().join("old_trimmed_R1.fastq.gz"), "r1").unwrap();
        let err = single_match(dir.path(), suffix).unwrap_err();
        assert!(matches!(err, StageError::AmbiguousInput { ref matches, .. } if matches.len() == 2));
    }

    #[test]
    fn list_files_skips_directories_and_sorts() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("b.gz")).unwrap();
        fs::write(dir.path().join("c.gz"), "").unwrap();
        fs::write(dir.path().join("a.gz"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = list_files(dir.path(), |n| n.ends_with(".gz")).unwrap();
        assert_eq!(files, vec![dir.path().join("a.gz"), dir.path().join("c.gz")]);
    }
}
