//! Core shared types for attendance-rs
//!
//! - [`Timestamp`] - wall-clock time attached to every decoded line
//! - [`ConnectionStatus`] - state of the scanner link as seen by the frontend
//! - [`WorkerStats`] - counters maintained by the backend worker

use chrono::{DateTime, Local};

/// Wall-clock time of a received line
pub type Timestamp = DateTime<Local>;

/// Date format used in the audit log and history table
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Connection status of the scanner link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// Not connected to the scanner
    #[default]
    Disconnected,
    /// Opening the device
    Connecting,
    /// Connected and reading lines
    Connected,
    /// The link failed; scan processing has halted
    Error,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connecting => write!(f, "Connecting..."),
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::Error => write!(f, "Error"),
        }
    }
}

/// Statistics about line processing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Lines read from the device
    pub lines_processed: u64,
    /// Identity scans handled (professor and students)
    pub scans: u64,
    /// Acknowledgements written back to the device
    pub acks_sent: u64,
    /// Lines that matched no protocol form
    pub malformed_lines: u64,
    /// Sensor fault sentinels received
    pub sensor_faults: u64,
    /// Environmental samples kept by an open session
    pub samples_recorded: u64,
    /// Environmental samples dropped because no session was open
    pub samples_discarded: u64,
    /// Sessions closed and persisted
    pub sessions_closed: u64,
    /// Number of messages dropped due to queue backpressure
    pub dropped_messages: u64,
    /// Raw bytes read from the scanner link
    pub bytes_received: u64,
}

impl WorkerStats {
    /// Fraction of lines that were malformed, as a percentage
    pub fn malformed_rate(&self) -> f64 {
        if self.lines_processed == 0 {
            0.0
        } else {
            (self.malformed_lines as f64 / self.lines_processed as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_status_display() {
        assert_eq!(ConnectionStatus::Connecting.to_string(), "Connecting...");
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_malformed_rate() {
        let mut stats = WorkerStats::default();
        assert_eq!(stats.malformed_rate(), 0.0);

        stats.lines_processed = 8;
        stats.malformed_lines = 2;
        assert_eq!(stats.malformed_rate(), 25.0);
    }
}
