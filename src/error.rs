//! Error handling for the attendance controller
//!
//! This module defines custom error types and a Result alias for use
//! throughout the application.

use thiserror::Error;

/// Main error type for attendance-rs operations
#[derive(Error, Debug)]
pub enum AttendanceError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding/decoding errors from the audit log or history table
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// The persisted history table does not have the expected columns
    #[error("History table has unexpected columns: found [{found}], expected [{expected}]")]
    HistorySchema { found: String, expected: String },

    /// A row in the persisted history table could not be parsed
    #[error("History table row {row} is invalid: {message}")]
    HistoryRow { row: usize, message: String },

    /// A row in the audit log could not be parsed
    #[error("Audit log row {row} is invalid: {message}")]
    AuditRow { row: usize, message: String },

    /// The scanner device went away (EOF or reader thread ended)
    #[error("Device disconnected")]
    DeviceDisconnected,

    /// Errors reported by the device transport
    #[error("Device error: {0}")]
    Device(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AttendanceError>,
    },
}

impl AttendanceError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AttendanceError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (or the error it wraps) means the device link is gone
    pub fn is_disconnect(&self) -> bool {
        match self {
            AttendanceError::DeviceDisconnected => true,
            AttendanceError::WithContext { source, .. } => source.is_disconnect(),
            _ => false,
        }
    }
}

/// Result type alias for attendance-rs operations
pub type Result<T> = std::result::Result<T, AttendanceError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<AttendanceError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
