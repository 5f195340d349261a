//! Console rendering of the attendance view

use std::fmt::Write;

use crate::frontend::state::AttendanceView;
use crate::session::SessionSummary;
use crate::storage::NO_DATA;
use crate::types::WorkerStats;

/// Status block: connection, session, environment, prediction
pub fn render_status_bar(view: &AttendanceView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}] {}", view.connection_status, view.session_text());
    let _ = writeln!(out, "{}", view.environment_text());
    let _ = writeln!(out, "{}", view.prediction_text());
    let _ = write!(out, "{}", render_stats(&view.stats));
    if let Some(error) = &view.last_error {
        let _ = write!(out, "\nError: {}", error);
    }
    out
}

/// One-line summary of the worker counters
pub fn render_stats(stats: &WorkerStats) -> String {
    format!(
        "Lines: {} ({} bytes) | Scans: {} | Acks: {} | Malformed: {} ({:.1}%) | Sensor faults: {} | Dropped: {}",
        stats.lines_processed,
        stats.bytes_received,
        stats.scans,
        stats.acks_sent,
        stats.malformed_lines,
        stats.malformed_rate(),
        stats.sensor_faults,
        stats.dropped_messages
    )
}

/// The session history as a fixed-width table
pub fn render_history_table(rows: &[SessionSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10}  {:<10}  {:<13}  {:>10}  {:>13}  {:>13}",
        "Date", "Subject", "Professor UID", "Attendance", "Avg Temp (°C)", "Avg Humid (%)"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:<10}  {:<10}  {:<13}  {:>10}  {:>13}  {:>13}",
            row.date.to_string(),
            row.subject_id,
            row.professor_uid,
            row.present_count,
            average(row.avg_temperature),
            average(row.avg_humidity)
        );
    }
    out
}

fn average(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| NO_DATA.to_string())
}
