//! Runs the pipeline for one sample: select, log, execute.
//!
//! This is the entry point the binary uses. It ties the sample selector,
//! the run logger and the stage table together.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Settings;
use crate::logging::{LogCallback, LogConfig, RunLogger};
use crate::process::ToolRunner;

use super::errors::{PipelineError, PipelineResult};
use super::pipeline::{Pipeline, PipelineRunResult};
use super::selector::SampleSelector;
use super::types::{Context, RunOptions};
use super::create_standard_pipeline;

/// Outcome of processing one sample.
#[derive(Debug, Clone)]
pub struct SampleRunReport {
    /// Sample that was processed.
    pub sample: String,
    /// Run log file.
    pub log_path: Option<PathBuf>,
    /// Stages whose commands ran.
    pub stages_ran: Vec<String>,
    /// Stages skipped from cache.
    pub stages_cached: Vec<String>,
}

impl SampleRunReport {
    fn new(sample: String, log_path: Option<PathBuf>, run: PipelineRunResult) -> Self {
        Self {
            sample,
            log_path,
            stages_ran: run.stages_ran,
            stages_cached: run.stages_cached,
        }
    }
}

/// Processes one sample through a stage table.
///
/// # Example
///
/// ```ignore
/// let processor = SampleProcessor::new(settings, Arc::new(ProcessRunner::new()));
/// let report = processor.process(&options, None)?;
/// println!("{}: ran {:?}", report.sample, report.stages_ran);
/// ```
pub struct SampleProcessor {
    settings: Settings,
    runner: Arc<dyn ToolRunner>,
    pipeline: Pipeline,
    log_config: LogConfig,
}

impl SampleProcessor {
    /// Processor using the standard stage table.
    pub fn new(settings: Settings, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            settings,
            runner,
            pipeline: create_standard_pipeline(),
            log_config: LogConfig::default(),
        }
    }

    /// Replace the stage table.
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Select the sample and run the requested stages on it.
    ///
    /// Stage names are checked before a sample is chosen, so a typo never
    /// claims a sample directory.
    pub fn process(
        &self,
        options: &RunOptions,
        callback: Option<LogCallback>,
    ) -> PipelineResult<SampleRunReport> {
        self.pipeline.select(&options.stages)?;

        let selector = SampleSelector::from_settings(&self.settings, options.mode);
        let sample = selector.select(options.sample.as_deref())?;
        tracing::info!("Processing sample {}", sample);

        let logger = RunLogger::new(
            sample.as_str(),
            &self.settings.paths.logs_dir,
            self.log_config.clone(),
            callback,
        )
        .map_err(|e| {
            PipelineError::setup(format!(
                "cannot open run log in {}: {}",
                self.settings.paths.logs_dir.display(),
                e
            ))
        })?;
        let logger = Arc::new(logger);
        let log_path = logger.log_path().map(PathBuf::from);

        let ctx = Context::new(
            self.settings.clone(),
            sample.as_str(),
            options,
            Arc::clone(&self.runner),
            Arc::clone(&logger),
        );
        if options.force {
            logger.warn("Force enabled: stage outputs will be cleared and rebuilt");
        }

        let result = self.pipeline.run(&ctx, &options.stages);
        logger.close();

        result.map(|run| SampleRunReport::new(sample, log_path, run))
    }
}
