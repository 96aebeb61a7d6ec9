//! Pipeline orchestrator for processing one sample at a time.
//!
//! This module provides the stage table, the per-stage cache logic and
//! sample selection. Stages talk to each other only through files in the
//! per-sample directories; the table order is the dependency order.
//!
//! # Architecture
//!
//! ```text
//! SampleProcessor
//!     ├── SampleSelector (explicit or next unprocessed sample)
//!     └── Pipeline
//!         ├── fastqc_before_trimming   (on request)
//!         ├── trimming
//!         ├── fastqc_after_trimming    (on request)
//!         ├── align
//!         ├── align_qc
//!         ├── filter
//!         ├── coverage
//!         ├── macs3
//!         ├── qc
//!         ├── ATACseqQC
//!         └── multiqc
//! ```
//!
//! Each stage runs through `StageExecutor`: skip if outputs are valid,
//! clean on force, validate inputs, execute.
//!
//! # Example
//!
//! ```ignore
//! use atacflow_core::orchestrator::{RunOptions, SampleProcessor};
//! use atacflow_core::process::ProcessRunner;
//!
//! let processor = SampleProcessor::new(settings, Arc::new(ProcessRunner::new()));
//! let options = RunOptions { stages: vec!["align".into()], ..RunOptions::default() };
//! let report = processor.process(&options, None)?;
//! println!("Ran: {:?}", report.stages_ran);
//! ```

mod errors;
mod executor;
mod pipeline;
mod sample_processor;
mod selector;
mod stage;
pub mod stages;
mod types;

pub use errors::{PipelineError, PipelineResult, StageError, StageResult};
pub use executor::StageExecutor;
pub use pipeline::{Pipeline, PipelineRunResult};
pub use sample_processor::{SampleProcessor, SampleRunReport};
pub use selector::{list_sample_dirs, SampleSelector};
pub use stage::PipelineStage;
pub use stages::{
    AlignQcStage, AlignStage, AtacSeqQcStage, CoverageStage, FastqcStage, FilterStage, Macs3Stage,
    MultiqcStage, QcStage, TrimmingStage,
};
pub use types::{Context, RunOptions, StageOutcome};

/// Create the standard pipeline with all stages in dependency order.
///
/// The FastQC stages only run when requested by name.
pub fn create_standard_pipeline() -> Pipeline {
    Pipeline::new()
        .with_stage(FastqcStage::before_trimming())
        .with_stage(TrimmingStage::new())
        .with_stage(FastqcStage::after_trimming())
        .with_stage(AlignStage::new())
        .with_stage(AlignQcStage::new())
        .with_stage(FilterStage::new())
        .with_stage(CoverageStage::new())
        .with_stage(Macs3Stage::new())
        .with_stage(QcStage::new())
        .with_stage(AtacSeqQcStage::new())
        .with_stage(MultiqcStage::new())
}
