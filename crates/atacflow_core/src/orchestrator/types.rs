//! Core types for the orchestrator pipeline.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Settings;
use crate::logging::RunLogger;
use crate::models::{AnalysisMode, SampleLayout};
use crate::process::{render_pipe, ToolCommand, ToolRunner};

use super::errors::{StageError, StageResult};

/// Runtime choices made once at startup. Not part of the config file.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Explicit sample; `None` means auto-discover.
    pub sample: Option<String>,
    /// Requested stage names; empty means a full run.
    pub stages: Vec<String>,
    /// Rebuild stages even when their outputs are present.
    pub force: bool,
    /// Takes precedence over `[options] threads`.
    pub threads: Option<usize>,
    pub mode: AnalysisMode,
}

/// Read-only context passed to pipeline stages.
///
/// Holds everything a stage may touch: settings, the sample's layout,
/// the runner used for external tools and the run logger. Stages share
/// nothing else; all hand-off between them goes through the filesystem.
pub struct Context {
    /// Application settings (paths already resolved).
    pub settings: Settings,
    /// Paths for the sample being processed.
    pub layout: SampleLayout,
    pub mode: AnalysisMode,
    /// Per-run logger.
    pub logger: Arc<RunLogger>,
    force: bool,
    threads: usize,
    runner: Arc<dyn ToolRunner>,
}

impl Context {
    pub fn new(
        settings: Settings,
        sample: impl Into<String>,
        options: &RunOptions,
        runner: Arc<dyn ToolRunner>,
        logger: Arc<RunLogger>,
    ) -> Self {
        let layout = SampleLayout::new(&settings, sample);
        let threads = options.threads.unwrap_or(settings.options.threads).max(1);
        Self {
            settings,
            layout,
            mode: options.mode,
            logger,
            force: options.force,
            threads,
            runner,
        }
    }

    pub fn sample(&self) -> &str {
        self.layout.sample()
    }

    pub fn force(&self) -> bool {
        self.force
    }

    /// Thread count forwarded to external tools.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run a command; non-zero exit fails the stage.
    pub fn run(&self, command: &ToolCommand) -> StageResult<()> {
        self.logger.command(&command.render());
        self.runner.run(command, true)?;
        Ok(())
    }

    /// Run `producer | consumer`; a non-zero exit on either side fails the stage.
    pub fn run_pipe(&self, producer: &ToolCommand, consumer: &ToolCommand) -> StageResult<()> {
        self.logger.command(&render_pipe(producer, consumer));
        self.runner.run_pipe(producer, consumer)?;
        Ok(())
    }

    /// Run a command and feed each stdout line to `on_line`.
    pub fn stream_lines(
        &self,
        command: &ToolCommand,
        on_line: &mut dyn FnMut(&str),
    ) -> StageResult<()> {
        self.logger.command(&command.render());
        self.runner.stream_lines(command, on_line)?;
        Ok(())
    }

    /// A configured reference path, or `MissingReference`.
    pub fn reference<'a>(&self, key: &str, value: &'a Option<PathBuf>) -> StageResult<&'a Path> {
        value
            .as_deref()
            .ok_or_else(|| StageError::missing_reference(key))
    }

    /// `create_dir_all` with stage error context.
    pub fn ensure_dir(&self, dir: &Path) -> StageResult<()> {
        fs::create_dir_all(dir)
            .map_err(|e| StageError::io(format!("creating {}", dir.display()), e))
    }
}

/// Result of executing one stage for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// Commands were run.
    Ran,
    /// Declared outputs were already valid; nothing was run.
    Cached,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogConfig;
    use crate::process::ProcessRunner;

    fn context(options: &RunOptions) -> Context {
        let mut settings = Settings::default();
        settings.options.threads = 6;
        Context::new(
            settings,
            "S1_ATAC",
            options,
            Arc::new(ProcessRunner::new()),
            Arc::new(RunLogger::without_file("test", LogConfig::quiet(), None)),
        )
    }

    #[test]
    fn threads_default_to_settings() {
        let ctx = context(&RunOptions::default());
        assert_eq!(ctx.threads(), 6);
        assert!(!ctx.force());
        assert_eq!(ctx.sample(), "S1_ATAC");
    }

    #[test]
    fn thread_override_wins() {
        let options = RunOptions {
            threads: Some(2),
            ..RunOptions::default()
        };
        assert_eq!(context(&options).threads(), 2);
    }

    #[test]
    fn unset_reference_is_an_error() {
        let ctx = context(&RunOptions::default());
        let err = ctx
            .reference("bowtie2_index", &ctx.settings.references.bowtie2_index)
            .unwrap_err();
        assert!(matches!(err, StageError::MissingReference { ref key } if key == "bowtie2_index"));
    }
}
