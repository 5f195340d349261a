//! Append-only audit log of student scans
//!
//! Header `Date,UID,Status`, written only when the file is created (or is
//! found empty). Rows are flushed one at a time so the file is always
//! complete up to the last acknowledged scan.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::config::ensure_dir;
use crate::error::{AttendanceError, Result, ResultExt};
use crate::session::AuditStatus;
use crate::types::DATE_FORMAT;

/// Column names of the audit log
pub const AUDIT_HEADER: [&str; 3] = ["Date", "UID", "Status"];

/// One row of the audit log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub date: NaiveDate,
    pub uid: String,
    pub status: AuditStatus,
}

impl AuditEntry {
    pub fn new(date: NaiveDate, uid: impl Into<String>, status: AuditStatus) -> Self {
        Self {
            date,
            uid: uid.into(),
            status,
        }
    }
}

/// Open handle on the audit log file
#[derive(Debug)]
pub struct AttendanceLog {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows_written: u64,
}

impl AttendanceLog {
    /// Open the log for appending, creating it with a header if needed
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_dir(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open audit log {:?}", path))?;

        let is_new = file
            .metadata()
            .with_context(|| format!("Failed to stat audit log {:?}", path))?
            .len()
            == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if is_new {
            tracing::info!("Creating audit log {:?}", path);
            writer.write_record(AUDIT_HEADER)?;
            writer.flush()?;
        }

        Ok(Self {
            path,
            writer,
            rows_written: 0,
        })
    }

    /// Append one scan and flush it to disk
    pub fn append(&mut self, entry: &AuditEntry) -> Result<()> {
        let date = entry.date.format(DATE_FORMAT).to_string();
        self.writer
            .write_record([date.as_str(), entry.uid.as_str(), entry.status.as_str()])
            .with_context(|| format!("Failed to append to audit log {:?}", self.path))?;
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush audit log {:?}", self.path))?;
        self.rows_written += 1;
        Ok(())
    }

    /// Rows appended through this handle
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every row of an audit log
    pub fn read_entries(path: impl AsRef<Path>) -> Result<Vec<AuditEntry>> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AttendanceError::Io(e)),
        };

        let mut reader = csv::Reader::from_reader(file);
        let mut entries = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let row = index + 1;
            let record = record?;
            let field = |i: usize| record.get(i).map(str::trim).unwrap_or_default();
            let date = NaiveDate::parse_from_str(field(0), DATE_FORMAT).map_err(|e| {
                AttendanceError::AuditRow {
                    row,
                    message: format!("invalid Date {:?}: {}", field(0), e),
                }
            })?;
            let status = parse_status(field(2)).ok_or_else(|| AttendanceError::AuditRow {
                row,
                message: format!("invalid Status {:?}", field(2)),
            })?;
            entries.push(AuditEntry::new(date, field(1), status));
        }
        Ok(entries)
    }
}

fn parse_status(text: &str) -> Option<AuditStatus> {
    match text {
        "Entry" => Some(AuditStatus::Entry),
        "Present" => Some(AuditStatus::Present),
        "Rejected" => Some(AuditStatus::Rejected),
        "Ignored" => Some(AuditStatus::Ignored),
        _ => None,
    }
}
