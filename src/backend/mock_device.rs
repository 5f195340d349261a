//! Scripted scanner for tests and demo runs
//!
//! [`MockDevice`] hands out a fixed list of inbound lines and records every
//! acknowledgement the worker writes back. Like the scanner firmware, it
//! refuses anything that is not an [`Ack`] token. What happens once the script is
//! used up is configurable, which lets tests drive the worker's shutdown,
//! disconnect, and failure paths without hardware.
//!
//! # Example
//!
//! ```ignore
//! use attendance_rs::backend::mock_device::{MockDevice, ScriptEnd};
//!
//! let device = MockDevice::new(["Student ID: PROF1234", "Student ID: A1"])
//!     .with_end(ScriptEnd::Disconnect);
//! let acks = device.acks();
//! // ... run the worker ...
//! assert_eq!(acks.snapshot(), vec!["Logged_1000", "Logged_1000"]);
//! ```
//!
//! Only available with the `mock-device` feature (enabled by default).

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{AttendanceError, Result, ResultExt};
use crate::protocol::Ack;

use super::device_trait::{DeviceLink, LinkStats};

/// Behaviour after the last scripted line has been read
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScriptEnd {
    /// Keep the link open and report no data
    #[default]
    Idle,
    /// Report end of stream
    Disconnect,
    /// Report a transport error with this message
    Fail(String),
}

/// Shared view of the acknowledgements a [`MockDevice`] received
#[derive(Debug, Clone, Default)]
pub struct MockAcks(Arc<Mutex<Vec<String>>>);

impl MockAcks {
    /// Copy of every line written so far
    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().map(|acks| acks.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.lock().map(|acks| acks.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, line: &str) -> Result<()> {
        self.0
            .lock()
            .map_err(|_| AttendanceError::Device("ack capture poisoned".to_string()))?
            .push(line.to_string());
        Ok(())
    }
}

/// Line sequence played to the worker as if it came from the scanner
#[derive(Debug)]
pub struct MockDevice {
    name: String,
    script: VecDeque<String>,
    end: ScriptEnd,
    acks: MockAcks,
    connected: bool,
    refuse_connect: bool,
    refuse_writes: bool,
    stats: LinkStats,
}

impl MockDevice {
    /// Create a device that plays `lines` in order
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: "mock:script".to_string(),
            script: lines.into_iter().map(Into::into).collect(),
            end: ScriptEnd::Idle,
            acks: MockAcks::default(),
            connected: false,
            refuse_connect: false,
            refuse_writes: false,
            stats: LinkStats::default(),
        }
    }

    /// Replay a capture file, one line per inbound message
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read mock script {:?}", path))?;
        let mut device = Self::new(content.lines());
        device.name = format!("mock:{}", path.display());
        tracing::info!(
            "Loaded {} scripted line(s) from {:?}",
            device.remaining(),
            path
        );
        Ok(device)
    }

    /// One complete session with a sensor sample and a few edge cases
    pub fn demo() -> Self {
        let mut device = Self::new([
            "Student ID: PROF1234",
            "Student ID: A1",
            "Temp: 25.0 C Humid: 40.0 %",
            "Student ID: B2",
            "!!!!!!DHT Error!!!!!!",
            "Temp: 26.0 C Humid: 42.0 %",
            "Student ID: A1",
            "Student ID: A1",
            "garbled line",
            "Student ID: PROF1234",
            "Student ID: C3",
        ]);
        device.name = "mock:demo".to_string();
        device
    }

    pub fn with_end(mut self, end: ScriptEnd) -> Self {
        self.end = end;
        self
    }

    /// Make `connect` fail
    pub fn refusing_connect(mut self) -> Self {
        self.refuse_connect = true;
        self
    }

    /// Make every `write_line` fail
    pub fn refusing_writes(mut self) -> Self {
        self.refuse_writes = true;
        self
    }

    /// Handle on the acknowledgements written to this device
    pub fn acks(&self) -> MockAcks {
        self.acks.clone()
    }

    /// Scripted lines not yet read
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl DeviceLink for MockDevice {
    fn connect(&mut self) -> Result<()> {
        if self.refuse_connect {
            return Err(AttendanceError::Device(format!(
                "{} refused the connection",
                self.name
            )));
        }
        self.connected = true;
        tracing::info!("Connected to {}", self.name);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>> {
        if !self.connected {
            return Err(AttendanceError::Device("not connected".to_string()));
        }

        if let Some(line) = self.script.pop_front() {
            self.stats.record_received(line.len() + 1);
            return Ok(Some(line.trim().to_string()));
        }

        match &self.end {
            ScriptEnd::Idle => {
                std::thread::sleep(timeout);
                Ok(None)
            }
            ScriptEnd::Disconnect => {
                self.connected = false;
                Err(AttendanceError::DeviceDisconnected)
            }
            ScriptEnd::Fail(message) => Err(AttendanceError::Device(message.clone())),
        }
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        if !self.connected {
            return Err(AttendanceError::Device("not connected".to_string()));
        }
        if self.refuse_writes {
            return Err(AttendanceError::Device(format!(
                "{} rejected write of {:?}",
                self.name, line
            )));
        }
        if Ack::from_token(line).is_none() {
            return Err(AttendanceError::Device(format!(
                "{} does not understand {:?}",
                self.name, line
            )));
        }
        self.acks.push(line)?;
        self.stats.record_sent();
        Ok(())
    }

    fn stats(&self) -> LinkStats {
        self.stats
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(1);

    #[test]
    fn test_plays_script_in_order() {
        let mut device = MockDevice::new(["  Student ID: A1 ", "Temp: 1 C Humid: 2 %"]);
        device.connect().unwrap();

        assert_eq!(device.read_line(TICK).unwrap().as_deref(), Some("Student ID: A1"));
        assert_eq!(
            device.read_line(TICK).unwrap().as_deref(),
            Some("Temp: 1 C Humid: 2 %")
        );
        assert_eq!(device.read_line(TICK).unwrap(), None);
        assert_eq!(device.stats().lines_received, 2);
    }

    #[test]
    fn test_captures_acks() {
        let mut device = MockDevice::new(Vec::<String>::new());
        let acks = device.acks();
        device.connect().unwrap();
        device.write_line("Logged_1000").unwrap();
        device.write_line("Ignored_1500").unwrap();

        assert_eq!(acks.snapshot(), vec!["Logged_1000", "Ignored_1500"]);
        assert_eq!(device.stats().lines_sent, 2);
    }

    #[test]
    fn test_script_end_behaviour() {
        let mut device = MockDevice::new(["x"]).with_end(ScriptEnd::Disconnect);
        device.connect().unwrap();
        device.read_line(TICK).unwrap();
        assert!(device.read_line(TICK).unwrap_err().is_disconnect());
        assert!(!device.is_connected());

        let mut device = MockDevice::new(Vec::<String>::new())
            .with_end(ScriptEnd::Fail("cable pulled".to_string()));
        device.connect().unwrap();
        let err = device.read_line(TICK).unwrap_err();
        assert!(err.to_string().contains("cable pulled"));
    }

    #[test]
    fn test_unknown_token_is_rejected() {
        let mut device = MockDevice::new(Vec::<String>::new());
        device.connect().unwrap();

        let err = device.write_line("Accepted").unwrap_err();
        assert!(err.to_string().contains("does not understand"));
        assert!(device.acks().is_empty());
        assert_eq!(device.stats().lines_sent, 0);
    }

    #[test]
    fn test_refusals() {
        let mut device = MockDevice::new(["x"]).refusing_connect();
        assert!(device.connect().is_err());

        let mut device = MockDevice::new(["x"]).refusing_writes();
        device.connect().unwrap();
        assert!(device.write_line("Logged_1000").is_err());
        assert!(device.acks().is_empty());
    }

    #[test]
    fn test_requires_connection() {
        let mut device = MockDevice::new(["x"]);
        assert!(device.read_line(TICK).is_err());
        assert!(device.write_line("Logged_1000").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.txt");
        std::fs::write(&path, "Student ID: PROF1234\nStudent ID: A1\n").unwrap();

        let device = MockDevice::from_file(&path).unwrap();
        assert_eq!(device.remaining(), 2);
        assert!(device.describe().ends_with("capture.txt"));
    }

    #[test]
    fn test_demo_script_is_non_empty() {
        let device = MockDevice::demo();
        assert!(device.remaining() > 5);
        assert_eq!(device.describe(), "mock:demo");
    }
}
