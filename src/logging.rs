/// Structured logging for the air quality service.
///
/// Provides context-rich logging with station identifiers, timestamps, and
/// severity levels. Supports both console output and file-based logging for
/// the scheduled ingestion worker.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Waqi,
    Database,
    Cache,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Waqi => write!(f, "WAQI"),
            DataSource::Database => write!(f, "DB"),
            DataSource::Cache => write!(f, "CACHE"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - station may be offline, decommissioned, or in maintenance
    Expected,
    /// Unexpected failure - indicates service degradation or configuration issue
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
}

impl Logger {
    /// Initialize the global logger
    pub fn init(min_level: LogLevel, log_file: Option<String>) {
        let logger = Logger { min_level, log_file };

        if let Ok(mut slot) = LOGGER.lock() {
            *slot = Some(logger);
        }
    }

    fn log(&self, level: LogLevel, source: &DataSource, station_id: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let station_part = station_id.map(|s| format!(" [{}]", s)).unwrap_or_default();
        let log_entry = format!(
            "{} {} {}{}: {}",
            timestamp, level, source, station_part, message
        );

        match level {
            LogLevel::Error | LogLevel::Warning => eprintln!("{}", log_entry),
            LogLevel::Info | LogLevel::Debug => println!("{}", log_entry),
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>) {
    Logger::init(min_level, log_file.map(String::from));
}

/// Log a general informational message
pub fn info(source: DataSource, station_id: Option<&str>, message: &str) {
    with_logger(|l| l.log(LogLevel::Info, &source, station_id, message));
}

/// Log a warning message
pub fn warn(source: DataSource, station_id: Option<&str>, message: &str) {
    with_logger(|l| l.log(LogLevel::Warning, &source, station_id, message));
}

/// Log an error message
pub fn error(source: DataSource, station_id: Option<&str>, message: &str) {
    with_logger(|l| l.log(LogLevel::Error, &source, station_id, message));
}

/// Log a debug message
pub fn debug(source: DataSource, station_id: Option<&str>, message: &str) {
    with_logger(|l| l.log(LogLevel::Debug, &source, station_id, message));
}

fn with_logger(f: impl FnOnce(&Logger)) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            f(logger);
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a WAQI station failure based on the error message.
pub fn classify_waqi_failure(_station_id: &str, error_message: &str) -> FailureType {
    // A station the provider no longer reports is routine; HTTP and parse
    // failures point at service or API-contract problems.
    if error_message.contains("No observations") || error_message.contains("status was not ok") {
        FailureType::Unknown
    } else if error_message.contains("HTTP error") {
        FailureType::Unexpected
    } else if error_message.contains("Parse error") {
        FailureType::Unexpected
    } else if error_message.contains("timed out") {
        FailureType::Expected
    } else {
        FailureType::Unknown
    }
}

/// Log a WAQI fetch failure with automatic classification.
pub fn log_waqi_failure(station_id: &str, operation: &str, err: &dyn std::error::Error) {
    let error_msg = err.to_string();
    let failure_type = classify_waqi_failure(station_id, &error_msg);

    let message = format!("{} failed [{}]: {}", operation, failure_type, error_msg);

    match failure_type {
        FailureType::Expected => debug(DataSource::Waqi, Some(station_id), &message),
        FailureType::Unexpected => error(DataSource::Waqi, Some(station_id), &message),
        FailureType::Unknown => warn(DataSource::Waqi, Some(station_id), &message),
    }
}

/// Log a cache-layer failure. Cache errors never escalate past a warning:
/// the cache is a performance layer, not a source of truth.
pub fn log_cache_failure(operation: &str, err: &dyn std::error::Error) {
    let message = format!("{} failed, continuing without cache: {}", operation, err);
    warn(DataSource::Cache, None, &message);
}

// ---------------------------------------------------------------------------
// Ingest Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of one ingestion batch.
pub fn log_ingest_summary(total: usize, successful: usize, failed: usize) {
    let message = format!(
        "Ingest complete: {}/{} successful, {} failed",
        successful, total, failed
    );

    if failed == 0 {
        info(DataSource::Waqi, None, &message);
    } else if successful == 0 {
        error(DataSource::Waqi, None, &message);
    } else {
        warn(DataSource::Waqi, None, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_failure_classification() {
        let gone = "No observations for station: jakarta-central";
        assert_eq!(classify_waqi_failure("jakarta-central", gone), FailureType::Unknown);

        let http = "HTTP error: 500";
        assert_eq!(classify_waqi_failure("jakarta-central", http), FailureType::Unexpected);

        let timeout = "Upstream fetch timed out for station: jakarta-central";
        assert_eq!(classify_waqi_failure("jakarta-central", timeout), FailureType::Expected);
    }
}
