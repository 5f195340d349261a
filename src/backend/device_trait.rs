//! DeviceLink trait for the scanner connection
//!
//! The worker only talks to the scanner through this trait, so the same
//! loop runs against a serial port, a TCP bridge, or a scripted mock.

use crate::error::Result;
use std::time::Duration;

/// Counters for one device link
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Complete lines received from the scanner
    pub lines_received: u64,
    /// Bytes received, including line terminators
    pub bytes_received: u64,
    /// Lines written back to the scanner
    pub lines_sent: u64,
}

impl LinkStats {
    /// Record one inbound line of `bytes` length
    pub fn record_received(&mut self, bytes: usize) {
        self.lines_received += 1;
        self.bytes_received += bytes as u64;
    }

    /// Record one outbound line
    pub fn record_sent(&mut self) {
        self.lines_sent += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Line-oriented link to the scanner
///
/// Implementations must be `Send` so the worker can own them on its
/// own thread.
///
/// # Example
///
/// ```ignore
/// fn echo_one(link: &mut dyn DeviceLink) -> Result<()> {
///     if let Some(line) = link.read_line(Duration::from_millis(10))? {
///         link.write_line(&line)?;
///     }
///     Ok(())
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait DeviceLink: Send {
    /// Open the link
    fn connect(&mut self) -> Result<()>;

    /// Close the link; safe to call when not connected
    fn disconnect(&mut self);

    /// Check whether the link is open
    fn is_connected(&self) -> bool;

    /// Wait up to `timeout` for the next trimmed line
    ///
    /// `Ok(None)` means nothing arrived in time. A closed stream is
    /// [`AttendanceError::DeviceDisconnected`](crate::error::AttendanceError::DeviceDisconnected).
    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>>;

    /// Write `line` followed by `\n` and flush
    fn write_line(&mut self, line: &str) -> Result<()>;

    /// Link counters
    fn stats(&self) -> LinkStats;

    /// Human-readable name of the link (device path or URL)
    fn describe(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_stats_counters() {
        let mut stats = LinkStats::default();
        stats.record_received(21);
        stats.record_received(10);
        stats.record_sent();

        assert_eq!(stats.lines_received, 2);
        assert_eq!(stats.bytes_received, 31);
        assert_eq!(stats.lines_sent, 1);

        stats.reset();
        assert_eq!(stats, LinkStats::default());
    }
}
