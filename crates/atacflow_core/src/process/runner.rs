//! Runner for external tools: single commands, two-process pipes and
//! line-streamed output.

use std::io::{BufRead, BufReader};
use std::process::{Child, ExitStatus, Stdio};

use super::command::ToolCommand;
use super::errors::{ProcessError, ProcessResult};

/// Seam between stages and the operating system.
///
/// Stages only ever talk to this trait, so tests can substitute a fake
/// that records invocations instead of starting real tools.
pub trait ToolRunner: Send + Sync {
    /// Run one command to completion.
    ///
    /// With `check` set, a non-zero exit is `ExternalToolFailure`; otherwise
    /// the exit code is returned for inspection (`-1` when killed by a signal).
    fn run(&self, command: &ToolCommand, check: bool) -> ProcessResult<i32>;

    /// Run `producer | consumer` and wait for both.
    ///
    /// Any unsuccessful exit on either side is `PipeFailure`. The producer's
    /// own stdout redirect, if any, is replaced by the pipe.
    fn run_pipe(&self, producer: &ToolCommand, consumer: &ToolCommand) -> ProcessResult<()>;

    /// Run a command and hand each stdout line to `on_line` as it arrives.
    ///
    /// Non-zero exit is `ExternalToolFailure`.
    fn stream_lines(
        &self,
        command: &ToolCommand,
        on_line: &mut dyn FnMut(&str),
    ) -> ProcessResult<()>;
}

/// Render `a | b` for logs and errors.
pub fn render_pipe(producer: &ToolCommand, consumer: &ToolCommand) -> String {
    format!("{} | {}", producer.render(), consumer.render())
}

/// Runs tools as real child processes.
///
/// Synchronous and without timeouts: a hung tool hangs the caller.
///
/// Commands are traced here at debug only. The info-level `$ cmd` line is
/// written by `Context::run`, `Context::run_pipe` and `Context::stream_lines`
/// through the run logger, which also mirrors it to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    fn spawn(command: &ToolCommand, stdout_piped: bool) -> ProcessResult<Child> {
        let mut cmd = command.to_command()?;
        if stdout_piped {
            cmd.stdout(Stdio::piped());
        }
        cmd.spawn()
            .map_err(|e| ProcessError::spawn(command.program_name(), e))
    }

    fn wait(child: &mut Child, command: &ToolCommand) -> ProcessResult<ExitStatus> {
        child
            .wait()
            .map_err(|e| ProcessError::io(format!("waiting for {}", command.program_name()), e))
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, command: &ToolCommand, check: bool) -> ProcessResult<i32> {
        tracing::debug!("Running: {}", command);

        let mut child = Self::spawn(command, false)?;
        let status = Self::wait(&mut child, command)?;

        if check && !status.success() {
            return Err(ProcessError::tool_failure(command.render(), status.code()));
        }

        Ok(status.code().unwrap_or(-1))
    }

    fn run_pipe(&self, producer: &ToolCommand, consumer: &ToolCommand) -> ProcessResult<()> {
        let rendered = render_pipe(producer, consumer);
        tracing::debug!("Running pipe: {}", rendered);

        let mut first = Self::spawn(producer, true)?;
        let pipe = first
            .stdout
            .take()
            .ok_or_else(|| ProcessError::io("capturing producer stdout", std::io::ErrorKind::BrokenPipe.into()))?;

        let mut consumer_cmd = match consumer.to_command() {
            Ok(cmd) => cmd,
            Err(e) => {
                let _ = first.kill();
                let _ = first.wait();
                return Err(e);
            }
        };
        consumer_cmd.stdin(Stdio::from(pipe));

        let spawned = consumer_cmd.spawn();
        // Close our copy of the read end; the consumer must be its only reader.
        drop(consumer_cmd);

        let mut second = match spawned {
            Ok(child) => child,
            Err(e) => {
                let _ = first.kill();
                let _ = first.wait();
                return Err(ProcessError::spawn(consumer.program_name(), e));
            }
        };

        // Reap both children before reporting either wait error.
        let consumer_status = Self::wait(&mut second, consumer);
        let producer_status = Self::wait(&mut first, producer);
        let consumer_status = consumer_status?;
        let producer_status = producer_status?;

        if !producer_status.success() || !consumer_status.success() {
            return Err(ProcessError::pipe_failure(
                rendered,
                producer_status.code(),
                consumer_status.code(),
            ));
        }

        Ok(())
    }

    fn stream_lines(
        &self,
        command: &ToolCommand,
        on_line: &mut dyn FnMut(&str),
    ) -> ProcessResult<()> {
        tracing::debug!("Streaming: {}", command);

        let mut child = Self::spawn(command, true)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProcessError::io("capturing stdout", std::io::ErrorKind::BrokenPipe.into()))?;

        let mut read_error = None;
        for chunk in BufReader::new(stdout).split(b'\n') {
            match chunk {
                Ok(bytes) => on_line(&String::from_utf8_lossy(&bytes)),
                Err(e) => {
                    read_error = Some(e);
                    break;
                }
            }
        }

        // stdout is closed by now, so a child still writing gets SIGPIPE.
        let status = Self::wait(&mut child, command)?;

        if let Some(e) = read_error {
            return Err(ProcessError::io(
                format!("reading output of {}", command.program_name()),
                e,
            ));
        }
        if !status.success() {
            return Err(ProcessError::tool_failure(command.render(), status.code()));
        }

        Ok(())
    }
}
