//! Backend module: the single worker that owns the scanner link
//!
//! All decoding, session transitions, persistence, and forecasting happen
//! on one worker thread. The presentation side never touches session or
//! history state; it sends commands and reads messages over crossbeam
//! channels.
//!
//! # Architecture
//!
//! - [`BackendCommand`] - Messages sent from the frontend to the worker
//! - [`BackendMessage`] - Messages sent from the worker to the frontend
//! - [`FrontendReceiver`] - Frontend-side handle for both channels
//! - [`AttendanceBackend`] - Entry point that owns the worker until `run`
//!
//! # Components
//!
//! - [`DeviceLink`] - Line-oriented scanner interface
//! - [`SerialDevice`] - Device node or TCP bridge transport
//! - [`MockDevice`] - Scripted scanner (feature-gated)
//! - [`BackendWorker`] - The worker loop
//!
//! # Example
//!
//! ```ignore
//! use attendance_rs::backend::{open_device, AttendanceBackend, BackendMessage};
//! use attendance_rs::config::AppConfig;
//!
//! let config = AppConfig::default();
//! let device = open_device(&config.device)?;
//! let (backend, frontend) = AttendanceBackend::new(config, device);
//!
//! std::thread::spawn(move || backend.run());
//! frontend.request_history();
//!
//! for msg in frontend.drain() {
//!     if let BackendMessage::SessionClosed(summary) = msg {
//!         println!("{} present", summary.present_count);
//!     }
//! }
//! ```

pub mod device;
pub mod device_trait;
#[cfg(feature = "mock-device")]
pub mod mock_device;
pub mod worker;

pub use device::{open_device, DeviceAddress, SerialDevice, FILE_SCHEME, MOCK_SCHEME, TCP_SCHEME};
pub use device_trait::{DeviceLink, LinkStats};
#[cfg(feature = "mock-device")]
pub use mock_device::{MockAcks, MockDevice, ScriptEnd};
pub use worker::BackendWorker;

use crate::analysis::Forecast;
use crate::config::AppConfig;
use crate::session::{AuditStatus, SessionSummary};
use crate::types::{ConnectionStatus, Timestamp, WorkerStats};
use chrono::NaiveDate;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Capacity of the frontend → worker command queue
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Capacity of the worker → frontend message queue
pub const MESSAGE_QUEUE_CAPACITY: usize = 4_096;

/// Message sent from the frontend to the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    /// Finish the current line, release the device, and stop
    Shutdown,
    /// Request current statistics
    RequestStats,
    /// Request the full session history
    RequestHistory,
}

/// Message sent from the worker to the frontend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendMessage {
    /// Scanner link status changed
    ConnectionStatus(ConnectionStatus),
    /// Scanner link could not be opened
    ConnectionError(String),
    /// The professor opened a session
    SessionOpened {
        subject: String,
        professor: String,
        started_at: Timestamp,
    },
    /// A student scan was written to the audit log
    ScanLogged {
        date: NaiveDate,
        uid: String,
        status: AuditStatus,
    },
    /// A sensor sample was added to the open session
    Environment { temperature: f64, humidity: f64 },
    /// A sensor sample arrived while no session was open
    EnvironmentDiscarded,
    /// The scanner reported a sensor failure
    SensorFault,
    /// A line matched no protocol form
    MalformedLine(String),
    /// The professor closed the session and its summary was persisted
    SessionClosed(SessionSummary),
    /// Forecast for the next session (`None` with fewer than two sessions)
    Prediction(Option<Forecast>),
    /// Full session history, oldest first
    History(Vec<SessionSummary>),
    /// Statistics snapshot
    Stats(WorkerStats),
    /// The worker stopped with a session still open
    SessionAbandoned { present: usize, pending: usize },
    /// Unrecoverable failure; scan processing has halted
    Fatal(String),
    /// The worker has stopped
    Shutdown,
}

/// Frontend handle on the worker's channels
pub struct FrontendReceiver {
    /// Receiver for worker messages
    pub receiver: Receiver<BackendMessage>,
    /// Sender for commands to the worker
    pub command_sender: Sender<BackendCommand>,
}

impl FrontendReceiver {
    /// Try to receive a message without blocking
    pub fn try_recv(&self) -> Option<BackendMessage> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for the next message
    ///
    /// `Disconnected` means the worker has gone away and the queue is empty.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<BackendMessage, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Receive all pending messages
    pub fn drain(&self) -> Vec<BackendMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.receiver.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Send a command to the worker
    pub fn send_command(&self, cmd: BackendCommand) -> bool {
        self.command_sender.send(cmd).is_ok()
    }

    /// Ask for a statistics snapshot
    pub fn request_stats(&self) {
        let _ = self.command_sender.send(BackendCommand::RequestStats);
    }

    /// Ask for the full history table
    pub fn request_history(&self) {
        let _ = self.command_sender.send(BackendCommand::RequestHistory);
    }

    /// Request shutdown
    pub fn shutdown(&self) {
        let _ = self.command_sender.send(BackendCommand::Shutdown);
    }
}

/// The attendance worker, not yet running
pub struct AttendanceBackend {
    config: AppConfig,
    device: Box<dyn DeviceLink>,
    command_receiver: Receiver<BackendCommand>,
    message_sender: Sender<BackendMessage>,
    running: Arc<AtomicBool>,
}

impl AttendanceBackend {
    /// Create a backend around `device` with its communication channels
    pub fn new(config: AppConfig, device: Box<dyn DeviceLink>) -> (Self, FrontendReceiver) {
        let (cmd_tx, cmd_rx) = bounded(COMMAND_QUEUE_CAPACITY);
        let (msg_tx, msg_rx) = bounded(MESSAGE_QUEUE_CAPACITY);

        let backend = Self {
            config,
            device,
            command_receiver: cmd_rx,
            message_sender: msg_tx,
            running: Arc::new(AtomicBool::new(true)),
        };

        let frontend = FrontendReceiver {
            receiver: msg_rx,
            command_sender: cmd_tx,
        };

        (backend, frontend)
    }

    /// Run the worker on the calling thread until shutdown or failure
    pub fn run(self) {
        let mut worker = BackendWorker::new(
            self.config,
            self.device,
            self.command_receiver,
            self.message_sender,
            self.running,
        );
        worker.run();
    }

    /// Get a handle to stop the worker without the command channel
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
