//! Chooses the sample a run works on.
//!
//! A sample counts as processed once it has a directory under the
//! terminal output root (the cleaned alignments). The directory is
//! created as soon as a sample is picked, so concurrent invocations
//! without `--input` pick different samples.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::models::AnalysisMode;

use super::errors::{PipelineError, PipelineResult};

/// Picks an explicit sample or discovers the next unprocessed one.
#[derive(Debug, Clone)]
pub struct SampleSelector {
    raw_root: PathBuf,
    terminal_root: PathBuf,
    suffix: String,
}

impl SampleSelector {
    pub fn new(
        raw_root: impl Into<PathBuf>,
        terminal_root: impl Into<PathBuf>,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            raw_root: raw_root.into(),
            terminal_root: terminal_root.into(),
            suffix: suffix.into(),
        }
    }

    pub fn from_settings(settings: &Settings, mode: AnalysisMode) -> Self {
        Self::new(
            &settings.paths.raw_input_dir,
            &settings.paths.cleaned_alignments_dir,
            mode.sample_suffix(),
        )
    }

    /// Explicit sample if given, otherwise auto-discovery.
    pub fn select(&self, explicit: Option<&str>) -> PipelineResult<String> {
        match explicit {
            Some(sample) => self.explicit(sample),
            None => self.discover(),
        }
    }

    /// Use `sample` as-is and create its terminal output directory.
    pub fn explicit(&self, sample: &str) -> PipelineResult<String> {
        if sample.is_empty() || sample.contains(['/', '\\']) || sample == "." || sample == ".." {
            return Err(PipelineError::setup(format!(
                "'{}' is not a valid sample name",
                sample
            )));
        }
        self.claim(sample)?;
        Ok(sample.to_string())
    }

    /// First raw sample (by name) with no terminal output directory.
    pub fn discover(&self) -> PipelineResult<String> {
        let processed = self.processed()?;
        let next = self
            .raw_samples()?
            .into_iter()
            .find(|s| !processed.contains(s));

        match next {
            Some(sample) => {
                tracing::debug!("Discovered unprocessed sample {}", sample);
                self.claim(&sample)?;
                Ok(sample)
            }
            None => Err(PipelineError::NoUnprocessedSamples {
                raw_root: self.raw_root.clone(),
                suffix: self.suffix.clone(),
            }),
        }
    }

    /// Raw sample directories of this analysis mode, sorted.
    pub fn raw_samples(&self) -> PipelineResult<Vec<String>> {
        list_sample_dirs(&self.raw_root, &self.suffix).map_err(|e| {
            PipelineError::setup(format!(
                "cannot list raw samples in {}: {}",
                self.raw_root.display(),
                e
            ))
        })
    }

    /// Samples already present under the terminal output root, sorted.
    pub fn processed(&self) -> PipelineResult<Vec<String>> {
        list_sample_dirs(&self.terminal_root, &self.suffix).map_err(|e| {
            PipelineError::setup(format!(
                "cannot list processed samples in {}: {}",
                self.terminal_root.display(),
                e
            ))
        })
    }

    fn claim(&self, sample: &str) -> PipelineResult<()> {
        let dir = self.terminal_root.join(sample);
        fs::create_dir_all(&dir).map_err(|e| {
            PipelineError::setup(format!("cannot create {}: {}", dir.display(), e))
        })
    }
}

/// Names of the immediate subdirectories of `root` ending in `suffix`, sorted.
///
/// A missing `root` yields an empty list.
pub fn list_sample_dirs(root: &Path, suffix: &str) -> io::Result<Vec<String>> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.ends_with(suffix) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}
