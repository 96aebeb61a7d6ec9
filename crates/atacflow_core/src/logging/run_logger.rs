//! Per-run logger handed to every stage.
//!
//! One logger is created per pipeline run and passed down explicitly.
//! It:
//! - Writes to a dedicated log file (optional)
//! - Forwards lines to a callback (optional)
//! - Mirrors messages into `tracing` so the terminal shows them too

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

/// Logger for one pipeline run.
pub struct RunLogger {
    /// Run name (normally the sample).
    name: String,
    /// Path to log file, if file output is enabled.
    log_path: Option<PathBuf>,
    /// File writer (buffered).
    file_writer: Mutex<Option<BufWriter<File>>>,
    /// Line callback.
    callback: Option<LogCallback>,
    /// Logging configuration.
    config: LogConfig,
}

impl RunLogger {
    /// Create a logger appending to `{log_dir}/{name}.log`.
    ///
    /// Appends rather than truncates: the log of a resumed sample keeps the
    /// history of earlier partial runs.
    pub fn new(
        name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> std::io::Result<Self> {
        let name = name.into();
        let log_dir = log_dir.as_ref();

        fs::create_dir_all(log_dir)?;
        let log_path = log_dir.join(format!("{}.log", sanitize_filename(&name)));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            name,
            log_path: Some(log_path),
            file_writer: Mutex::new(Some(BufWriter::new(file))),
            callback,
            config,
        })
    }

    /// Create a logger without a log file.
    pub fn without_file(
        name: impl Into<String>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> Self {
        Self {
            name: name.into(),
            log_path: None,
            file_writer: Mutex::new(None),
            callback,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }

        if self.config.mirror_to_tracing {
            match level {
                LogLevel::Trace => tracing::trace!(run = %self.name, "{}", message),
                LogLevel::Debug => tracing::debug!(run = %self.name, "{}", message),
                LogLevel::Info => tracing::info!(run = %self.name, "{}", message),
                LogLevel::Warn => tracing::warn!(run = %self.name, "{}", message),
                LogLevel::Error => tracing::error!(run = %self.name, "{}", message),
            }
        }

        let formatted = self.format_message(level, message);
        self.output(&formatted);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &MessagePrefix::Warning.format(message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &MessagePrefix::Error.format(message));
    }

    /// Log a command line about to be executed.
    pub fn command(&self, command: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Command.format(command));
    }

    /// Log the start of a stage.
    pub fn phase(&self, stage_name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Phase.format(stage_name));
    }

    /// Log a cache-hit skip decision.
    pub fn skip(&self, message: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Skip.format(message));
    }

    /// Log a forced directory clean.
    pub fn clean(&self, message: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Clean.format(message));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Success.format(message));
    }

    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Flush and release the log file.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn format_message(&self, level: LogLevel, message: &str) -> String {
        let level = level.as_filter_str().to_ascii_uppercase();
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
            format!("[{}] {} - {}", timestamp, level, message)
        } else {
            format!("{} - {}", level, message)
        }
    }

    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
            // Flushed per line so the tail survives a crash.
            let _ = writer.flush();
        }

        if let Some(ref callback) = self.callback {
            callback(formatted);
        }
    }
}

impl Drop for RunLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sanitize a string to be safe for use as a filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn creates_log_file() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new("S1_ATAC", dir.path(), LogConfig::quiet(), None).unwrap();

        let path = logger.log_path().unwrap();
        assert!(path.exists());
        assert!(path.to_string_lossy().ends_with("S1_ATAC.log"));
    }

    #[test]
    fn writes_prefixed_lines() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new("S1", dir.path(), LogConfig::quiet(), None).unwrap();

        logger.command("samtools index S1.bam");
        logger.skip("align: outputs exist");
        logger.flush();

        let content = fs::read_to_string(logger.log_path().unwrap()).unwrap();
        assert!(content.contains("INFO - $ samtools index S1.bam"));
        assert!(content.contains("[SKIP] align: outputs exist"));
    }

    #[test]
    fn appends_across_loggers() {
        let dir = tempdir().unwrap();
        {
            let first = RunLogger::new("S1", dir.path(), LogConfig::quiet(), None).unwrap();
            first.info("first run");
        }
        let second = RunLogger::new("S1", dir.path(), LogConfig::quiet(), None).unwrap();
        second.info("second run");
        second.flush();

        let content = fs::read_to_string(second.log_path().unwrap()).unwrap();
        assert!(content.contains("first run"));
        assert!(content.contains("second run"));
    }

    #[test]
    fn filters_below_level() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let callback: LogCallback = Box::new(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let mut config = LogConfig::quiet();
        config.level = LogLevel::Warn;
        let logger = RunLogger::without_file("S1", config, Some(callback));

        logger.debug("hidden");
        logger.info("hidden");
        logger.warn("shown");
        logger.error("shown");

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn sanitizes_filename() {
        assert_eq!(sanitize_filename("normal_name"), "normal_name");
        assert_eq!(sanitize_filename("has/slash"), "has_slash");
        assert_eq!(sanitize_filename("a<b>c"), "a_b_c");
    }
}
