//! Integration tests for the attendance view model
//!
//! These tests feed real worker output into `AttendanceView` and check the
//! rendered status surface.

mod common;

use attendance_rs::backend::BackendMessage;
use attendance_rs::frontend::{render_history_table, render_status_bar, AttendanceView};
use attendance_rs::types::ConnectionStatus;
use common::builders::SummaryBuilder;

#[cfg(feature = "mock-device")]
mod demo_run {
    use super::*;
    use crate::common::assert_float_eq;
    use crate::common::builders::ConfigBuilder;
    use crate::common::mock_helpers::{collect_until_shutdown, spawn_backend};
    use attendance_rs::backend::{MockDevice, ScriptEnd};

    fn run_demo() -> AttendanceView {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigBuilder::in_dir(dir.path()).build();
        let device = MockDevice::demo().with_end(ScriptEnd::Disconnect);

        let (handle, frontend) = spawn_backend(config, device);
        let messages = collect_until_shutdown(&frontend);
        handle.join().unwrap();

        let mut view = AttendanceView::new();
        view.apply_all(messages);
        view
    }

    #[test]
    fn test_demo_session_view() {
        let view = run_demo();

        assert_eq!(view.session_text(), "Session: Inactive");
        assert_eq!(view.environment_text(), "Temp: N/A °C | Humid: N/A %");
        // One session on record is not enough for a trend
        assert_eq!(view.prediction_text(), "Next Session Prediction: N/A");

        assert_eq!(view.history.len(), 1);
        let summary = &view.history[0];
        assert_eq!(summary.present_count, 1);
        assert_float_eq(summary.avg_temperature.unwrap(), 25.5, 1e-9);
        assert_float_eq(summary.avg_humidity.unwrap(), 41.0, 1e-9);
    }

    #[test]
    fn test_demo_scrollback() {
        let view = run_demo();

        let statuses: Vec<&str> = view
            .log
            .iter()
            .map(|line| line.rsplit(" | ").next().unwrap())
            .collect();
        assert_eq!(
            statuses,
            vec!["Entry", "Entry", "Present", "Ignored", "Rejected"]
        );
        assert!(view.log.back().unwrap().contains(" | C3 | "));
    }

    #[test]
    fn test_demo_ends_with_fatal_disconnect() {
        let view = run_demo();

        assert!(view.shut_down);
        assert_eq!(view.connection_status, ConnectionStatus::Error);
        assert!(view.last_error.as_deref().unwrap().contains("disconnected"));
        assert_eq!(view.stats.malformed_lines, 1);
        assert_eq!(view.stats.sensor_faults, 1);
        assert_eq!(view.stats.sessions_closed, 1);
    }
}

#[test]
fn test_history_message_seeds_table() {
    let mut view = AttendanceView::new();
    view.apply(BackendMessage::History(vec![
        SummaryBuilder::new(10).environment(24.0, 45.0).build(),
        SummaryBuilder::new(12).date(2025, 3, 4).build(),
    ]));

    let table = render_history_table(&view.history);
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("Avg Temp (°C)"));
    assert!(lines[1].contains("24.00"));
    assert!(lines[2].trim_end().ends_with("N/A"));
}

#[test]
fn test_status_bar_tracks_connection() {
    let mut view = AttendanceView::new();
    assert!(render_status_bar(&view).starts_with("[Disconnected] Session: Inactive"));

    view.apply(BackendMessage::ConnectionStatus(ConnectionStatus::Connecting));
    assert!(render_status_bar(&view).starts_with("[Connecting...]"));
}
