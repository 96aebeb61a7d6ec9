//! External tool execution.
//!
//! This module provides:
//! - `ToolCommand`, a structured command line with explicit redirections
//! - `ToolRunner`, the trait stages use to start tools
//! - `ProcessRunner`, the implementation backed by `std::process`
//!
//! # Example
//!
//! ```no_run
//! use atacflow_core::process::{ProcessRunner, ToolCommand, ToolRunner};
//!
//! let runner = ProcessRunner::new();
//! let align = ToolCommand::new("bowtie2").args(["-x", "genome", "-1", "r1.fq.gz", "-2", "r2.fq.gz"]);
//! let sort = ToolCommand::new("samtools").args(["sort", "-o", "S1_align.bam", "-"]);
//! runner.run_pipe(&align, &sort).unwrap();
//! runner.run(&ToolCommand::new("samtools").args(["index", "S1_align.bam"]), true).unwrap();
//! ```

mod command;
mod errors;
mod runner;

pub use command::{shell_quote, ToolCommand};
pub use errors::{ProcessError, ProcessResult};
pub use runner::{render_pipe, ProcessRunner, ToolRunner};
