//! Force-invalidation: wiping a stage's output directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from cache maintenance.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A clean was requested on a path that must never be wiped.
    #[error("Refusing to clean unsafe directory: '{}'", .path.display())]
    RefusedUnsafePath { path: PathBuf },

    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl CacheError {
    fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Paths that are never cleaned, regardless of caller.
fn is_unsafe(path: &Path) -> bool {
    let raw = path.as_os_str();
    raw.is_empty() || raw == "/" || raw == "."
}

/// Delete everything inside `dir`, keeping `dir` itself.
///
/// Fails with [`CacheError::RefusedUnsafePath`] for `""`, `"/"` and `"."`
/// before touching the filesystem. A directory that does not exist is
/// left alone.
pub fn clean_directory(dir: impl AsRef<Path>) -> CacheResult<()> {
    let dir = dir.as_ref();

    if is_unsafe(dir) {
        return Err(CacheError::RefusedUnsafePath {
            path: dir.to_path_buf(),
        });
    }

    if !dir.exists() {
        return Ok(());
    }

    let entries = fs::read_dir(dir)
        .map_err(|e| CacheError::io(format!("listing {}", dir.display()), e))?;

    for entry in entries {
        let entry = entry.map_err(|e| CacheError::io(format!("listing {}", dir.display()), e))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| CacheError::io(format!("inspecting {}", path.display()), e))?;

        // Symlinks are removed, never followed.
        if file_type.is_dir() {
            fs::remove_dir_all(&path)
                .map_err(|e| CacheError::io(format!("removing {}", path.display()), e))?;
        } else {
            fs::remove_file(&path)
                .map_err(|e| CacheError::io(format!("removing {}", path.display()), e))?;
        }
    }

    tracing::debug!("Cleaned {}", dir.display());
    Ok(())
}

/// Delete a single file, for stages that share their directory with another
/// stage. A missing file is not an error.
pub fn remove_file_if_present(path: impl AsRef<Path>) -> CacheResult<()> {
    let path = path.as_ref();

    if is_unsafe(path) {
        return Err(CacheError::RefusedUnsafePath {
            path: path.to_path_buf(),
        });
    }

    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CacheError::io(format!("removing {}", path.display()), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn refuses_unsafe_paths() {
        for bad in ["", "/", "."] {
            let err = clean_directory(bad).unwrap_err();
            assert!(
                matches!(err, CacheError::RefusedUnsafePath { .. }),
                "expected refusal for {:?}, got {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn unsafe_message_names_path() {
        let err = clean_directory("/").unwrap_err();
        assert!(err.to_string().contains("'/'"));
    }

    #[test]
    fn missing_directory_is_noop() {
        let dir = tempdir().unwrap();
        clean_directory(dir.path().join("never_created")).unwrap();
    }

    #[test]
    fn removes_contents_but_keeps_directory() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("S1");
        fs::create_dir_all(target.join("nested/deeper")).unwrap();
        fs::write(target.join("S1_align.bam"), "bam").unwrap();
        fs::write(target.join("nested/deeper/log.txt"), "log").unwrap();

        clean_directory(&target).unwrap();

        assert!(target.is_dir());
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);
    }

    #[test]
    fn leaves_siblings_alone() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("S1");
        let sibling = dir.path().join("S2");
        fs::create_dir_all(&target).unwrap();
        fs::create_dir_all(&sibling).unwrap();
        fs::write(sibling.join("S2_align.bam"), "bam").unwrap();

        clean_directory(&target).unwrap();

        assert!(sibling.join("S2_align.bam").exists());
    }

    #[test]
    fn removes_single_file_and_tolerates_absence() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("S1_qc_metrics.tsv");
        let neighbour = dir.path().join("S1_idxstats.txt");
        fs::write(&target, "stale").unwrap();
        fs::write(&neighbour, "keep").unwrap();

        remove_file_if_present(&target).unwrap();
        remove_file_if_present(&target).unwrap();

        assert!(!target.exists());
        assert!(neighbour.exists());
        assert!(matches!(
            remove_file_if_present(""),
            Err(CacheError::RefusedUnsafePath { .. })
        ));
    }
}
