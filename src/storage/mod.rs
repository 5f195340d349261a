//! CSV persistence for attendance data
//!
//! Two files are maintained:
//!
//! - **Audit log** ([`AttendanceLog`]): one row per processed student scan,
//!   append-only, header `Date,UID,Status` written once at creation.
//! - **History table** ([`HistoryStore`]): one row per closed session,
//!   loaded at startup and rewritten in full on every close.
//!
//! [`Stores`] bundles both for the worker.

pub mod audit;
pub mod history;

pub use audit::{AttendanceLog, AuditEntry, AUDIT_HEADER};
pub use history::{HistoryStore, HISTORY_HEADER, NO_DATA};

use crate::config::StorageConfig;
use crate::error::Result;

/// Both persisted files, owned by the worker
#[derive(Debug)]
pub struct Stores {
    pub history: HistoryStore,
    pub audit: AttendanceLog,
}

impl Stores {
    /// Load the history table and open the audit log
    ///
    /// History is loaded first so a corrupt table fails startup before the
    /// audit log is touched.
    pub fn open(storage: &StorageConfig) -> Result<Self> {
        let history = HistoryStore::open(storage.session_history_path())?;
        let audit = AttendanceLog::open(storage.attendance_log_path())?;
        Ok(Self { history, audit })
    }
}
