//! View model fed by backend messages
//!
//! [`AttendanceView`] is a plain data bus: the binary drains the backend's
//! message queue into [`AttendanceView::apply`] and renders the fields. It
//! holds copies only; nothing here can change session or history state.

use std::collections::VecDeque;

use crate::backend::BackendMessage;
use crate::session::SessionSummary;
use crate::types::{ConnectionStatus, Timestamp, WorkerStats};

/// Audit lines kept for display
pub const DEFAULT_SCROLLBACK: usize = 200;

/// Latest environmental reading shown to the operator
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EnvironmentReading {
    /// No reading in the current session
    #[default]
    Unknown,
    /// Last sample kept by the open session
    Reading { temperature: f64, humidity: f64 },
    /// The scanner reported a sensor fault
    Error,
}

/// Everything the presentation layer shows
#[derive(Debug, Clone)]
pub struct AttendanceView {
    /// Scanner link status
    pub connection_status: ConnectionStatus,
    /// Start time of the open session, if any
    pub session_started: Option<Timestamp>,
    /// Environmental label state
    pub environment: EnvironmentReading,
    /// Rounded forecast for the next session
    pub prediction: Option<i64>,
    /// Recent `date | uid | status` lines, oldest first
    pub log: VecDeque<String>,
    /// Session history, oldest first
    pub history: Vec<SessionSummary>,
    /// Last statistics snapshot
    pub stats: WorkerStats,
    /// Most recent connection or fatal error
    pub last_error: Option<String>,
    /// The worker has stopped
    pub shut_down: bool,
    scrollback: usize,
}

impl Default for AttendanceView {
    fn default() -> Self {
        Self::with_scrollback(DEFAULT_SCROLLBACK)
    }
}

impl AttendanceView {
    pub fn new() -> Self {
        Self::default()
    }

    /// View keeping at most `scrollback` audit lines
    pub fn with_scrollback(scrollback: usize) -> Self {
        Self {
            connection_status: ConnectionStatus::Disconnected,
            session_started: None,
            environment: EnvironmentReading::Unknown,
            prediction: None,
            log: VecDeque::with_capacity(scrollback.min(DEFAULT_SCROLLBACK)),
            history: Vec::new(),
            stats: WorkerStats::default(),
            last_error: None,
            shut_down: false,
            scrollback: scrollback.max(1),
        }
    }

    /// Fold one backend message into the view
    pub fn apply(&mut self, msg: BackendMessage) {
        match msg {
            BackendMessage::ConnectionStatus(status) => self.connection_status = status,
            BackendMessage::ConnectionError(error) | BackendMessage::Fatal(error) => {
                self.last_error = Some(error);
            }
            BackendMessage::SessionOpened { started_at, .. } => {
                self.session_started = Some(started_at);
                self.environment = EnvironmentReading::Unknown;
            }
            BackendMessage::ScanLogged { date, uid, status } => {
                self.push_log(format!("{} | {} | {}", date, uid, status));
            }
            BackendMessage::Environment {
                temperature,
                humidity,
            } => {
                self.environment = EnvironmentReading::Reading {
                    temperature,
                    humidity,
                };
            }
            BackendMessage::SensorFault => self.environment = EnvironmentReading::Error,
            BackendMessage::EnvironmentDiscarded | BackendMessage::MalformedLine(_) => {}
            BackendMessage::SessionClosed(summary) => {
                self.session_started = None;
                self.environment = EnvironmentReading::Unknown;
                self.history.push(summary);
            }
            BackendMessage::Prediction(forecast) => {
                self.prediction = forecast.map(|f| f.rounded());
            }
            BackendMessage::History(rows) => self.history = rows,
            BackendMessage::Stats(stats) => self.stats = stats,
            BackendMessage::SessionAbandoned { present, pending } => {
                self.session_started = None;
                self.push_log(format!(
                    "Session abandoned ({} present, {} pending)",
                    present, pending
                ));
            }
            BackendMessage::Shutdown => self.shut_down = true,
        }
    }

    /// Fold a batch of messages, as returned by `FrontendReceiver::drain`
    pub fn apply_all(&mut self, messages: impl IntoIterator<Item = BackendMessage>) {
        for msg in messages {
            self.apply(msg);
        }
    }

    pub fn is_session_active(&self) -> bool {
        self.session_started.is_some()
    }

    /// `Session: Inactive` or `Session: Active (Started HH:MM:SS)`
    pub fn session_text(&self) -> String {
        match &self.session_started {
            Some(started) => format!("Session: Active (Started {})", started.format("%H:%M:%S")),
            None => "Session: Inactive".to_string(),
        }
    }

    pub fn environment_text(&self) -> String {
        match self.environment {
            EnvironmentReading::Unknown => "Temp: N/A °C | Humid: N/A %".to_string(),
            EnvironmentReading::Reading {
                temperature,
                humidity,
            } => format!("Temp: {:.1} °C | Humid: {:.1} %", temperature, humidity),
            EnvironmentReading::Error => "Temp: Error | Humid: Error".to_string(),
        }
    }

    pub fn prediction_text(&self) -> String {
        match self.prediction {
            Some(n) => format!("Next Session Prediction: {}", n),
            None => "Next Session Prediction: N/A".to_string(),
        }
    }

    fn push_log(&mut self, line: String) {
        if self.log.len() == self.scrollback {
            self.log.pop_front();
        }
        self.log.push_back(line);
    }
}
