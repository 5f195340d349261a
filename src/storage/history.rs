//! Session history table
//!
//! Loaded once when the worker starts. A missing file means an empty
//! history; any other load problem (wrong columns, unparsable rows) is an
//! error so that forecasting never silently restarts from nothing.
//!
//! Every close appends one row and rewrites the whole file through a
//! temporary file and a rename.

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::analysis::{Forecast, TrendAccumulator};
use crate::config::ensure_dir;
use crate::error::{AttendanceError, Result, ResultExt};
use crate::session::SessionSummary;
use crate::types::DATE_FORMAT;

/// Column names of the history table, in order
pub const HISTORY_HEADER: [&str; 6] = [
    "Date",
    "Subject",
    "Prof_UID",
    "Attendance_Count",
    "Avg_Temp",
    "Avg_Humid",
];

/// Written in place of an average when the session had no samples
pub const NO_DATA: &str = "N/A";

/// Persisted list of session summaries in close order
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    rows: Vec<SessionSummary>,
    trend: TrendAccumulator,
}

impl HistoryStore {
    /// Load the table at `path`, or start empty if the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let rows = match File::open(&path) {
            Ok(file) => read_rows(file)
                .with_context(|| format!("Failed to load session history {:?}", path))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No session history at {:?}, starting empty", path);
                Vec::new()
            }
            Err(e) => {
                return Err(AttendanceError::Io(e)
                    .with_context(format!("Failed to open session history {:?}", path)))
            }
        };

        tracing::info!("Loaded {} session(s) from {:?}", rows.len(), path);
        let trend = TrendAccumulator::from_counts(rows.iter().map(|r| r.present_count));

        Ok(Self { path, rows, trend })
    }

    /// Append a closed session and rewrite the table
    ///
    /// If the rewrite fails the row is not kept in memory either.
    pub fn append(&mut self, summary: SessionSummary) -> Result<()> {
        self.rows.push(summary);
        if let Err(e) = write_table(&self.path, &self.rows) {
            self.rows.pop();
            return Err(e.with_context(format!(
                "Failed to write session history {:?}",
                self.path
            )));
        }
        if let Some(last) = self.rows.last() {
            self.trend.push(last.present_count);
        }
        Ok(())
    }

    /// All sessions, oldest first
    pub fn rows(&self) -> &[SessionSummary] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Predicted attendance for the next session (needs two sessions)
    pub fn forecast(&self) -> Option<Forecast> {
        self.trend.forecast()
    }
}

fn read_rows(file: File) -> Result<Vec<SessionSummary>> {
    let mut reader = csv::Reader::from_reader(file);

    let headers = reader.headers()?.clone();
    let found: Vec<&str> = headers.iter().map(str::trim).collect();
    if found != HISTORY_HEADER {
        return Err(AttendanceError::HistorySchema {
            found: found.join(","),
            expected: HISTORY_HEADER.join(","),
        });
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let row = index + 1;
        let record = record.map_err(|e| AttendanceError::HistoryRow {
            row,
            message: e.to_string(),
        })?;
        rows.push(parse_row(&record).map_err(|message| AttendanceError::HistoryRow { row, message })?);
    }
    Ok(rows)
}

fn parse_row(record: &csv::StringRecord) -> std::result::Result<SessionSummary, String> {
    let field = |i: usize| record.get(i).map(str::trim).unwrap_or_default();

    let date = NaiveDate::parse_from_str(field(0), DATE_FORMAT)
        .map_err(|e| format!("invalid Date {:?}: {}", field(0), e))?;

    Ok(SessionSummary {
        date,
        subject_id: field(1).to_string(),
        professor_uid: field(2).to_string(),
        present_count: parse_count(field(3))?,
        avg_temperature: parse_average(field(4))
            .map_err(|e| format!("invalid Avg_Temp: {}", e))?,
        avg_humidity: parse_average(field(5))
            .map_err(|e| format!("invalid Avg_Humid: {}", e))?,
    })
}

/// Counts may have been written as `12` or `12.0` by other tools
fn parse_count(text: &str) -> std::result::Result<u32, String> {
    if let Ok(count) = text.parse::<u32>() {
        return Ok(count);
    }
    match text.parse::<f64>() {
        Ok(v) if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => Ok(v as u32),
        _ => Err(format!("invalid Attendance_Count {:?}", text)),
    }
}

fn parse_average(text: &str) -> std::result::Result<Option<f64>, String> {
    if text.is_empty() || text.eq_ignore_ascii_case(NO_DATA) || text.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    text.parse::<f64>()
        .map(Some)
        .map_err(|_| format!("{:?} is not a number", text))
}

fn format_average(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => NO_DATA.to_string(),
    }
}

fn write_table(path: &Path, rows: &[SessionSummary]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    {
        let mut writer = csv::Writer::from_path(&tmp)?;
        writer.write_record(HISTORY_HEADER)?;
        for row in rows {
            writer.write_record([
                row.date.format(DATE_FORMAT).to_string(),
                row.subject_id.clone(),
                row.professor_uid.clone(),
                row.present_count.to_string(),
                format_average(row.avg_temperature),
                format_average(row.avg_humidity),
            ])?;
        }
        writer.flush()?;
    }

    std::fs::rename(&tmp, path)?;
    Ok(())
}
