//! Attendance session lifecycle
//!
//! A session is opened and closed by the professor's card. While it is open,
//! students are tracked with dual-scan verification (entry, then exit) and
//! environmental samples are accumulated. Closing produces a
//! [`SessionSummary`] for the history table.

pub mod environment;
pub mod machine;
pub mod types;

pub use environment::{EnvironmentAggregator, EnvironmentAverages, EnvironmentSample};
pub use machine::{SessionMachine, SessionState};
pub use types::{AttendanceRecord, AuditStatus, ScanOutcome, Session, SessionSummary};
