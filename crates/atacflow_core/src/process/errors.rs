//! Error types for external process execution.

use std::io;

use thiserror::Error;

/// Errors from running external tools.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The program could not be started at all.
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The process ran and exited unsuccessfully.
    #[error("Command exited with {}: {command}", describe_exit(.exit_code))]
    ExternalToolFailure {
        command: String,
        exit_code: Option<i32>,
    },

    /// At least one side of a two-process pipe exited unsuccessfully.
    #[error(
        "Pipe failed (producer {}, consumer {}): {command}",
        describe_exit(.exit_code_a),
        describe_exit(.exit_code_b)
    )]
    PipeFailure {
        command: String,
        exit_code_a: Option<i32>,
        exit_code_b: Option<i32>,
    },

    /// I/O around the process (redirect files, reading output).
    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl ProcessError {
    pub fn spawn(program: impl Into<String>, source: io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    pub fn tool_failure(command: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self::ExternalToolFailure {
            command: command.into(),
            exit_code,
        }
    }

    pub fn pipe_failure(
        command: impl Into<String>,
        exit_code_a: Option<i32>,
        exit_code_b: Option<i32>,
    ) -> Self {
        Self::PipeFailure {
            command: command.into(),
            exit_code_a,
            exit_code_b,
        }
    }

    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// `None` means the process was killed by a signal.
fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "termination by signal".to_string(),
    }
}

/// Result type for process operations.
pub type ProcessResult<T> = Result<T, ProcessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_failure_displays_code_and_command() {
        let err = ProcessError::tool_failure("samtools index S1.bam", Some(2));
        let msg = err.to_string();
        assert!(msg.contains("exit code 2"));
        assert!(msg.contains("samtools index S1.bam"));
    }

    #[test]
    fn pipe_failure_displays_both_sides() {
        let err = ProcessError::pipe_failure("bowtie2 ... | samtools sort ...", Some(1), None);
        let msg = err.to_string();
        assert!(msg.contains("producer exit code 1"));
        assert!(msg.contains("consumer termination by signal"));
    }
}
