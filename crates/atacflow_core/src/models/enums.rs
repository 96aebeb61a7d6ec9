//! Core enums used throughout the pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Library protocol of the samples being processed.
///
/// Selects which raw sample directories are eligible for auto-discovery
/// and how peak calling treats a control sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// ATAC-seq (no control).
    #[default]
    Atac,
    /// ChIP-seq (optional input/background control).
    Chip,
}

impl AnalysisMode {
    /// Suffix a raw sample directory name must carry to belong to this mode.
    pub fn sample_suffix(&self) -> &'static str {
        match self {
            AnalysisMode::Atac => "ATAC",
            AnalysisMode::Chip => "CHIP",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisMode::Atac => write!(f, "atac"),
            AnalysisMode::Chip => write!(f, "chip"),
        }
    }
}

impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "atac" => Ok(AnalysisMode::Atac),
            "chip" => Ok(AnalysisMode::Chip),
            other => Err(format!("unknown analysis mode '{}' (expected atac or chip)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("ATAC".parse::<AnalysisMode>().unwrap(), AnalysisMode::Atac);
        assert_eq!("chip".parse::<AnalysisMode>().unwrap(), AnalysisMode::Chip);
        assert!("rna".parse::<AnalysisMode>().is_err());
    }

    #[test]
    fn suffix_matches_protocol() {
        assert_eq!(AnalysisMode::Atac.sample_suffix(), "ATAC");
        assert_eq!(AnalysisMode::Chip.sample_suffix(), "CHIP");
    }
}
