//! Artifact cache: the on-disk record of stage completion.
//!
//! There is no manifest or journal. A stage counts as done when every
//! artifact it declares is present and valid, and forcing a stage wipes
//! its output directories wholesale before it runs again.
//!
//! # Example
//!
//! ```no_run
//! use atacflow_core::cache::{clean_directory, outputs_valid, Artifact};
//!
//! let outputs = vec![
//!     Artifact::file("/data/align/S1/S1_align.bam"),
//!     Artifact::file("/data/align/S1/S1_align.bam.bai"),
//! ];
//!
//! if !outputs_valid(&outputs) {
//!     clean_directory("/data/align/S1").unwrap();
//! }
//! ```

mod artifact;
mod clean;

pub use artifact::{outputs_valid, Artifact, ArtifactKind};
pub use clean::{clean_directory, remove_file_if_present, CacheError, CacheResult};
