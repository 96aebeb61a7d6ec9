//! Declared stage outputs and their validity predicate.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Kind of filesystem object an artifact is expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Regular file; valid when it exists and is non-empty.
    File,
    /// Directory; valid when it exists, contents are not inspected.
    Directory,
}

/// A path whose presence marks (part of) a stage as complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    path: PathBuf,
    kind: ArtifactKind,
}

impl Artifact {
    /// A file artifact.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ArtifactKind::File,
        }
    }

    /// A directory artifact.
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ArtifactKind::Directory,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Check the validity predicate for this artifact.
    ///
    /// Directories are only checked for existence. A file artifact that turns
    /// out to be a directory (or the other way round) is invalid.
    pub fn is_valid(&self) -> bool {
        let Ok(meta) = fs::metadata(&self.path) else {
            return false;
        };

        match self.kind {
            ArtifactKind::File => meta.is_file() && meta.len() > 0,
            ArtifactKind::Directory => meta.is_dir(),
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Returns true if every artifact is valid.
///
/// Stops at the first invalid artifact. An empty list is trivially valid.
pub fn outputs_valid(artifacts: &[Artifact]) -> bool {
    for artifact in artifacts {
        if !artifact.is_valid() {
            tracing::debug!("Artifact missing or empty: {}", artifact);
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn non_empty_file_is_valid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("S1_align.bam");
        fs::write(&path, b"BAM\x01").unwrap();

        assert!(Artifact::file(&path).is_valid());
    }

    #[test]
    fn empty_file_is_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("S1_align.bam");
        fs::write(&path, b"").unwrap();

        assert!(!Artifact::file(&path).is_valid());
    }

    #[test]
    fn missing_path_is_invalid() {
        let dir = tempdir().unwrap();
        assert!(!Artifact::file(dir.path().join("nope")).is_valid());
        assert!(!Artifact::directory(dir.path().join("nope")).is_valid());
    }

    #[test]
    fn empty_directory_is_valid() {
        let dir = tempdir().unwrap();
        assert!(Artifact::directory(dir.path()).is_valid());
    }

    #[test]
    fn kind_mismatch_is_invalid() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("report.html");
        fs::write(&file, "x").unwrap();

        assert!(!Artifact::file(dir.path()).is_valid());
        assert!(!Artifact::directory(&file).is_valid());
    }

    #[test]
    fn outputs_valid_requires_every_artifact() {
        let dir = tempdir().unwrap();
        let bam = dir.path().join("S1_align.bam");
        let bai = dir.path().join("S1_align.bam.bai");
        fs::write(&bam, "data").unwrap();

        let outputs = vec![Artifact::file(&bam), Artifact::file(&bai)];
        assert!(!outputs_valid(&outputs));

        fs::write(&bai, "").unwrap();
        assert!(!outputs_valid(&outputs));

        fs::write(&bai, "index").unwrap();
        assert!(outputs_valid(&outputs));
    }

    #[test]
    fn empty_list_is_valid() {
        assert!(outputs_valid(&[]));
    }
}
