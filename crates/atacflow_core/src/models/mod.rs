//! Data models shared across the pipeline.
//!
//! - `AnalysisMode`, the library protocol being processed
//! - `SampleLayout`, the per-sample directory and file naming convention

mod enums;
mod layout;

pub use enums::AnalysisMode;
pub use layout::{bam_index, SampleLayout, AGGREGATE_METRICS_FILE, MULTIQC_DIR};
