//! Logging infrastructure.
//!
//! This module provides:
//! - `RunLogger`, an explicit per-run handle passed to every stage
//!   (file output + optional callback + `tracing` mirror)
//! - `init_tracing` for the process-wide `tracing` subscriber
//!
//! # Example
//!
//! ```no_run
//! use atacflow_core::logging::{LogConfig, RunLogger};
//!
//! let logger = RunLogger::new("S1_ATAC", "data/logs", LogConfig::default(), None).unwrap();
//! logger.phase("align");
//! logger.command("samtools index S1_ATAC_align.bam");
//! logger.success("align completed");
//! ```

mod run_logger;
mod types;

pub use run_logger::RunLogger;
pub use types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG`, falling back to `default_level`. Output goes to
/// stderr. Call once at startup; later calls are ignored.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
