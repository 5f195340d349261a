//! # attendance-rs: RFID Classroom Attendance Controller
//!
//! Reads newline-delimited messages from an RFID scanner with an attached
//! temperature/humidity sensor, runs a professor-gated attendance session
//! with dual-scan (entry + exit) verification, answers every identity scan
//! with an acknowledgement token, and persists an audit log plus a session
//! history used to forecast the next session's attendance.
//!
//! ## Architecture
//!
//! - **Backend**: a single worker thread owns the device link, the session
//!   state machine, and both CSV stores
//! - **Frontend**: a read-only view model fed by backend messages
//! - **Communication**: crossbeam channels between the two sides
//!
//! ## Data Location
//!
//! The audit log, history table, and rolling log file live in the
//! platform-appropriate data directory under `dev.attendance-rs` unless
//! `storage.data_dir` is configured.
//!
//! ## Example
//!
//! ```ignore
//! use attendance_rs::{
//!     backend::{open_device, AttendanceBackend},
//!     config::AppConfig,
//!     frontend::AttendanceView,
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load_or_default("attendance.toml")?;
//!     let device = open_device(&config.device)?;
//!     let (backend, frontend) = AttendanceBackend::new(config, device);
//!
//!     std::thread::spawn(move || backend.run());
//!
//!     let mut view = AttendanceView::new();
//!     while !view.shut_down {
//!         if let Ok(msg) = frontend.recv_timeout(std::time::Duration::from_millis(100)) {
//!             view.apply(msg);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod backend;
pub mod config;
pub mod error;
pub mod frontend;
pub mod protocol;
pub mod session;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use backend::{AttendanceBackend, BackendCommand, BackendMessage, FrontendReceiver};
pub use config::AppConfig;
pub use error::{AttendanceError, Result};
pub use frontend::AttendanceView;
pub use protocol::{decode_line, Ack, DeviceEvent};
pub use session::{ScanOutcome, SessionMachine, SessionSummary};
pub use types::{ConnectionStatus, Timestamp, WorkerStats};
