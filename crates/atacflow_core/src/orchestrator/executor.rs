//! Skip / force / validate / run sequence applied to every stage.

use crate::cache::{clean_directory, outputs_valid, remove_file_if_present};

use super::errors::StageResult;
use super::stage::PipelineStage;
use super::types::{Context, StageOutcome};

/// Runs one stage for the context's sample.
pub struct StageExecutor<'a> {
    ctx: &'a Context,
}

impl<'a> StageExecutor<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Execute `stage`, honouring the artifact cache.
    ///
    /// Fixed order:
    /// 1. Compute expected outputs
    /// 2. Not forcing and all outputs valid: log the skip and return `Cached`
    /// 3. Forcing: clean every output directory and file of the stage
    /// 4. Validate upstream inputs
    /// 5. Execute
    pub fn run(&self, stage: &dyn PipelineStage) -> StageResult<StageOutcome> {
        let ctx = self.ctx;
        let name = stage.name();
        let expected = stage.expected_outputs(ctx);

        if ctx.force() {
            for dir in stage.clean_dirs(ctx) {
                ctx.logger.clean(&format!("{}: clearing {}", name, dir.display()));
                clean_directory(&dir)?;
            }
            for file in stage.clean_files(ctx) {
                ctx.logger.clean(&format!("{}: removing {}", name, file.display()));
                remove_file_if_present(&file)?;
            }
        } else if !expected.is_empty() && outputs_valid(&expected) {
            ctx.logger.skip(&format!(
                "{}: outputs exist for {}; skipping (use --force to overwrite)",
                name,
                ctx.sample()
            ));
            return Ok(StageOutcome::Cached);
        }

        ctx.logger.debug(&format!("Validating inputs for '{}'", name));
        stage.validate_inputs(ctx)?;

        ctx.logger.debug(&format!("Executing '{}'", name));
        stage.execute(ctx)?;

        let produced = stage.expected_outputs(ctx);
        if let Some(missing) = produced.iter().find(|a| !a.is_valid()) {
            ctx.logger.warn(&format!(
                "{}: finished but {} is missing or empty",
                name, missing
            ));
        }

        Ok(StageOutcome::Ran)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tempfile::tempdir;

    use crate::cache::Artifact;
    use crate::config::Settings;
    use crate::logging::{LogConfig, RunLogger};
    use crate::orchestrator::errors::{require_file, StageError};
    use crate::orchestrator::types::RunOptions;
    use crate::process::ProcessRunner;

    /// Writes `out/result.txt`, requiring `in/input.txt`.
    struct WritingStage {
        root: PathBuf,
        executions: AtomicUsize,
    }

    impl WritingStage {
        fn new(root: PathBuf) -> Self {
            Self {
                root,
                executions: AtomicUsize::new(0),
            }
        }

        fn count(&self) -> usize {
            self.executions.load(Ordering::SeqCst)
        }
    }

    impl PipelineStage for WritingStage {
        fn name(&self) -> &str {
            "writing"
        }

        fn expected_outputs(&self, _ctx: &Context) -> Vec<Artifact> {
            vec![Artifact::file(self.root.join("out").join("result.txt"))]
        }

        fn clean_dirs(&self, _ctx: &Context) -> Vec<PathBuf> {
            vec![self.root.join("out")]
        }

        fn validate_inputs(&self, _ctx: &Context) -> StageResult<()> {
            require_file("input", &self.root.join("in").join("input.txt"))
        }

        fn execute(&self, _ctx: &Context) -> StageResult<()> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            let out = self.root.join("out");
            fs::create_dir_all(&out).unwrap();
            fs::write(out.join("result.txt"), "done").unwrap();
            Ok(())
        }
    }

    fn context(force: bool) -> Context {
        let options = RunOptions {
            force,
            ..RunOptions::default()
        };
        Context::new(
            Settings::default(),
            "S1",
            &options,
            Arc::new(ProcessRunner::new()),
            Arc::new(RunLogger::without_file("test", LogConfig::quiet(), None)),
        )
    }

    fn with_input(root: &std::path::Path) {
        fs::create_dir_all(root.join("in")).unwrap();
        fs::write(root.join("in").join("input.txt"), "x").unwrap();
    }

    #[test]
    fn second_run_is_cached() {
        crate::logging::init_test_tracing();
        let dir = tempdir().unwrap();
        with_input(dir.path());
        let stage = WritingStage::new(dir.path().to_path_buf());
        let ctx = context(false);
        let executor = StageExecutor::new(&ctx);

        assert_eq!(executor.run(&stage).unwrap(), StageOutcome::Ran);
        assert_eq!(executor.run(&stage).unwrap(), StageOutcome::Cached);
        assert_eq!(stage.count(), 1);
    }

    #[test]
    fn empty_output_is_rebuilt() {
        let dir = tempdir().unwrap();
        with_input(dir.path());
        fs::create_dir_all(dir.path().join("out")).unwrap();
        fs::write(dir.path().join("out").join("result.txt"), "").unwrap();

        let stage = WritingStage::new(dir.path().to_path_buf());
        let ctx = context(false);
        assert_eq!(StageExecutor::new(&ctx).run(&stage).unwrap(), StageOutcome::Ran);
        assert_eq!(stage.count(), 1);
    }

    #[test]
    fn force_cleans_before_running() {
        let dir = tempdir().unwrap();
        with_input(dir.path());
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("result.txt"), "old").unwrap();
        fs::write(out.join("stale.tmp"), "partial").unwrap();

        let stage = WritingStage::new(dir.path().to_path_buf());
        let ctx = context(true);
        assert_eq!(StageExecutor::new(&ctx).run(&stage).unwrap(), StageOutcome::Ran);

        assert!(!out.join("stale.tmp").exists());
        assert_eq!(fs::read_to_string(out.join("result.txt")).unwrap(), "done");
    }

    #[test]
    fn missing_input_fails_without_running() {
        let dir = tempdir().unwrap();
        let stage = WritingStage::new(dir.path().to_path_buf());
        let ctx = context(false);

        let err = StageExecutor::new(&ctx).run(&stage).unwrap_err();
        assert!(matches!(err, StageError::MissingInput { .. }));
        assert_eq!(stage.count(), 0);
    }
}
