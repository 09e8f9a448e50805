#![deny(missing_docs)]
//! Shared logging utilities for the repost workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase,
//! the [`PipelineLog`] collaborator the pipeline writes diagnostics through,
//! and a minimal test initializer for the global logger.

use std::fmt::Write as _;
use std::sync::Mutex;

pub use log::Level;

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Destination for structured pipeline diagnostics.
///
/// The pipeline only ever talks to this trait; which sink backs it is decided
/// once at startup.
pub trait PipelineLog: Send + Sync {
    /// Records `message` at `level` with ordered key/value context.
    fn log(&self, level: Level, message: &str, context: &[(&str, String)]);
}

/// Forwards pipeline diagnostics to the global `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct FacadeLog;

impl PipelineLog for FacadeLog {
    fn log(&self, level: Level, message: &str, context: &[(&str, String)]) {
        if context.is_empty() {
            log::log!(level, "{message}");
        } else {
            log::log!(level, "{message} {}", render_context(context));
        }
    }
}

/// One captured pipeline log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Severity of the entry.
    pub level: Level,
    /// Human readable message.
    pub message: String,
    /// Context pairs in the order they were supplied.
    pub context: Vec<(String, String)>,
}

impl LogRecord {
    /// Returns the value recorded for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Keeps every entry in memory, owned by the instance.
#[derive(Debug, Default)]
pub struct MemoryLog {
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all records captured so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Returns the records at or above `level` in severity.
    pub fn at_least(&self, level: Level) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|record| record.level <= level)
            .collect()
    }
}

impl PipelineLog for MemoryLog {
    fn log(&self, level: Level, message: &str, context: &[(&str, String)]) {
        let record = LogRecord {
            level,
            message: message.to_string(),
            context: context
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
        };
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

fn render_context(context: &[(&str, String)]) -> String {
    let mut out = String::new();
    for (idx, (key, value)) in context.iter().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        if value.contains(char::is_whitespace) {
            let _ = write!(out, "{key}={value:?}");
        } else {
            let _ = write!(out, "{key}={value}");
        }
    }
    out
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
