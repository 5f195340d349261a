//! Session data types

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::protocol::Ack;
use crate::types::Timestamp;

use super::environment::EnvironmentAggregator;

/// Entry/exit times of one identity within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceRecord {
    /// First scan
    pub entered_at: Timestamp,
    /// Second scan; once set the record never changes again
    pub exited_at: Option<Timestamp>,
}

impl AttendanceRecord {
    /// Whether both entry and exit were scanned
    pub fn is_present(&self) -> bool {
        self.exited_at.is_some()
    }
}

/// One open attendance period, bounded by two professor scans
#[derive(Debug, Clone)]
pub struct Session {
    /// Subject taught in this session
    pub subject_id: String,
    /// Professor who opened the session
    pub professor_uid: String,
    /// Time of the opening scan
    pub started_at: Timestamp,
    /// Per-identity dual-scan bookkeeping
    pub records: HashMap<String, AttendanceRecord>,
    /// Environmental samples collected while open
    pub environment: EnvironmentAggregator,
}

impl Session {
    /// Open a new session
    pub fn new(
        subject_id: impl Into<String>,
        professor_uid: impl Into<String>,
        started_at: Timestamp,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            professor_uid: professor_uid.into(),
            started_at,
            records: HashMap::new(),
            environment: EnvironmentAggregator::new(),
        }
    }

    /// Identities that completed entry and exit
    pub fn present_count(&self) -> usize {
        self.records.values().filter(|r| r.is_present()).count()
    }

    /// Identities that scanned in but not out
    pub fn pending_count(&self) -> usize {
        self.records.len() - self.present_count()
    }

    /// Bookkeeping for one identity
    pub fn record(&self, uid: &str) -> Option<&AttendanceRecord> {
        self.records.get(uid)
    }

    /// Convert into the persisted summary
    pub fn summarize(&self) -> SessionSummary {
        let averages = self.environment.averages();
        SessionSummary {
            date: self.started_at.date_naive(),
            subject_id: self.subject_id.clone(),
            professor_uid: self.professor_uid.clone(),
            present_count: self.present_count() as u32,
            avg_temperature: averages.temperature,
            avg_humidity: averages.humidity,
        }
    }
}

/// Persisted aggregate of a closed session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    /// Date the session started
    pub date: NaiveDate,
    pub subject_id: String,
    pub professor_uid: String,
    /// Identities with both entry and exit scanned
    pub present_count: u32,
    /// Mean temperature, `None` when the sensor never reported
    pub avg_temperature: Option<f64>,
    /// Mean humidity, `None` when the sensor never reported
    pub avg_humidity: Option<f64>,
}

/// Status column of the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditStatus {
    Entry,
    Present,
    Rejected,
    Ignored,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Entry => "Entry",
            AuditStatus::Present => "Present",
            AuditStatus::Rejected => "Rejected",
            AuditStatus::Ignored => "Ignored",
        }
    }
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of feeding one identity scan to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// Professor opened a session
    SessionOpened { started_at: Timestamp },
    /// Professor closed the session
    SessionClosed(SessionSummary),
    /// First scan of a student in this session
    Entry,
    /// Second scan of a student in this session
    Present,
    /// Student already completed entry and exit
    Ignored,
    /// Non-professor scan while no session is open
    Rejected,
}

impl ScanOutcome {
    /// Acknowledgement to send back to the scanner
    pub fn ack(&self) -> Ack {
        match self {
            ScanOutcome::SessionOpened { .. }
            | ScanOutcome::SessionClosed(_)
            | ScanOutcome::Entry
            | ScanOutcome::Present => Ack::Logged,
            ScanOutcome::Ignored => Ack::Ignored,
            ScanOutcome::Rejected => Ack::Rejected,
        }
    }

    /// Audit log status; professor open/close scans are not audited
    pub fn audit_status(&self) -> Option<AuditStatus> {
        match self {
            ScanOutcome::SessionOpened { .. } | ScanOutcome::SessionClosed(_) => None,
            ScanOutcome::Entry => Some(AuditStatus::Entry),
            ScanOutcome::Present => Some(AuditStatus::Present),
            ScanOutcome::Ignored => Some(AuditStatus::Ignored),
            ScanOutcome::Rejected => Some(AuditStatus::Rejected),
        }
    }
}
