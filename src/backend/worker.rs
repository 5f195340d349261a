//! Backend Worker Thread Implementation
//!
//! The worker is the only writer of session state, the audit log, and the
//! history table. It reads one line at a time from the scanner and handles
//! it completely before reading the next:
//!
//! 1. decode the line
//! 2. run the session state machine
//! 3. persist the outcome (audit row, or history rewrite on close)
//! 4. write the acknowledgement back to the scanner
//! 5. publish messages for the frontend
//!
//! Frontend commands are checked between lines, so a shutdown never
//! interrupts a line half way. Any persistence or transport failure halts
//! the worker with a [`BackendMessage::Fatal`].
//!
//! Messages go out with `try_send`; a full queue drops the message and
//! counts it in [`WorkerStats::dropped_messages`]. The final
//! [`BackendMessage::Shutdown`] is the only blocking send. A frontend that
//! fell behind can recover state with `RequestHistory` and `RequestStats`.

use crate::backend::device_trait::DeviceLink;
use crate::backend::{BackendCommand, BackendMessage};
use crate::config::AppConfig;
use crate::error::{AttendanceError, Result, ResultExt};
use crate::protocol::{decode_line, Ack, DeviceEvent};
use crate::session::{EnvironmentSample, ScanOutcome, SessionMachine};
use crate::storage::{AuditEntry, Stores};
use crate::types::{ConnectionStatus, Timestamp, WorkerStats};
use chrono::Local;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The worker that owns the scanner link and all attendance state
pub struct BackendWorker {
    /// Application configuration
    config: AppConfig,
    /// Command receiver from the frontend
    command_rx: Receiver<BackendCommand>,
    /// Message sender to the frontend
    message_tx: Sender<BackendMessage>,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Scanner link
    device: Box<dyn DeviceLink>,
    /// Session lifecycle
    machine: SessionMachine,
    /// Current connection status
    connection_status: ConnectionStatus,
    /// Statistics
    stats: WorkerStats,
}

impl BackendWorker {
    /// Create a new backend worker
    pub fn new(
        config: AppConfig,
        device: Box<dyn DeviceLink>,
        command_rx: Receiver<BackendCommand>,
        message_tx: Sender<BackendMessage>,
        running: Arc<AtomicBool>,
    ) -> Self {
        let machine = SessionMachine::new(config.classroom.clone());

        Self {
            config,
            command_rx,
            message_tx,
            running,
            device,
            machine,
            connection_status: ConnectionStatus::Disconnected,
            stats: WorkerStats::default(),
        }
    }

    /// Run the main worker loop
    pub fn run(&mut self) {
        tracing::info!("Backend worker started");

        match self.start() {
            Ok(mut stores) => {
                while self.running.load(Ordering::SeqCst) {
                    self.process_commands(&stores);
                    if !self.running.load(Ordering::SeqCst) {
                        break;
                    }

                    if let Err(e) = self.step(&mut stores) {
                        self.fail(e);
                        break;
                    }
                }
            }
            Err(e) => self.fail(e),
        }

        self.finish();
    }

    /// Open storage, publish the startup forecast, and connect
    fn start(&mut self) -> Result<Stores> {
        let stores = Stores::open(&self.config.storage)?;

        let forecast = stores.history.forecast();
        match &forecast {
            Some(f) => tracing::info!(
                "Predicted attendance for next session: {} ({} session(s) on record)",
                f.rounded(),
                stores.history.len()
            ),
            None => tracing::info!(
                "Not enough history for a prediction ({} session(s))",
                stores.history.len()
            ),
        }
        self.try_send_message(BackendMessage::Prediction(forecast));

        self.update_connection_status(ConnectionStatus::Connecting);
        if let Err(e) = self.device.connect() {
            self.update_connection_status(ConnectionStatus::Error);
            self.try_send_message(BackendMessage::ConnectionError(e.to_string()));
            return Err(e.with_context(format!(
                "Failed to connect to scanner at {}",
                self.device.describe()
            )));
        }
        self.update_connection_status(ConnectionStatus::Connected);

        Ok(stores)
    }

    /// Wait for one line and handle it
    fn step(&mut self, stores: &mut Stores) -> Result<()> {
        let poll = self.config.device.poll_interval();
        match self.device.read_line(poll)? {
            Some(line) => self.handle_line(stores, &line, Local::now()),
            None => Ok(()),
        }
    }

    /// Process pending commands from the frontend
    fn process_commands(&mut self, stores: &Stores) {
        loop {
            match self.command_rx.try_recv() {
                Ok(cmd) => self.handle_command(cmd, stores),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }
    }

    /// Handle a single command
    fn handle_command(&mut self, cmd: BackendCommand, stores: &Stores) {
        match cmd {
            BackendCommand::Shutdown => {
                tracing::info!("Shutdown requested");
                self.running.store(false, Ordering::SeqCst);
            }
            BackendCommand::RequestStats => {
                self.send_stats();
            }
            BackendCommand::RequestHistory => {
                self.try_send_message(BackendMessage::History(stores.history.rows().to_vec()));
            }
        }
    }

    /// Handle one trimmed line received at `at`
    pub(crate) fn handle_line(
        &mut self,
        stores: &mut Stores,
        line: &str,
        at: Timestamp,
    ) -> Result<()> {
        self.stats.lines_processed += 1;

        let event = decode_line(line, at);
        tracing::debug!("Decoded {} line {:?}", event.kind(), line);

        match event {
            DeviceEvent::Identity { uid, at } => self.handle_scan(stores, &uid, at)?,
            DeviceEvent::Sensor {
                temperature,
                humidity,
                ..
            } => self.handle_sample(temperature, humidity),
            DeviceEvent::SensorFault => {
                self.stats.sensor_faults += 1;
                tracing::warn!("DHT sensor error reported by scanner");
                self.try_send_message(BackendMessage::SensorFault);
            }
            DeviceEvent::Malformed(text) => {
                self.stats.malformed_lines += 1;
                tracing::warn!("Ignoring unrecognized line {:?}", text);
                self.try_send_message(BackendMessage::MalformedLine(text));
            }
        }
        Ok(())
    }

    /// Decide, persist, acknowledge, then publish
    fn handle_scan(&mut self, stores: &mut Stores, uid: &str, at: Timestamp) -> Result<()> {
        self.stats.scans += 1;

        let outcome = self
            .machine
            .try_scan(uid, at, |outcome| persist(stores, uid, at, outcome))?;

        self.acknowledge(outcome.ack())
            .with_context(|| format!("Failed to acknowledge scan of {}", uid))?;

        self.announce(stores, uid, at, outcome);
        Ok(())
    }

    fn handle_sample(&mut self, temperature: f64, humidity: f64) {
        let sample = EnvironmentSample {
            temperature,
            humidity,
        };

        if self.machine.record_sample(sample) {
            self.stats.samples_recorded += 1;
            tracing::debug!("Logged Temp: {} C, Humid: {} %", temperature, humidity);
            self.try_send_message(BackendMessage::Environment {
                temperature,
                humidity,
            });
        } else {
            self.stats.samples_discarded += 1;
            tracing::warn!(
                "Discarding sensor sample ({} C, {} %) while no session is open",
                temperature,
                humidity
            );
            self.try_send_message(BackendMessage::EnvironmentDiscarded);
        }
    }

    fn acknowledge(&mut self, ack: Ack) -> Result<()> {
        self.device.write_line(ack.token())?;
        self.stats.acks_sent += 1;
        Ok(())
    }

    /// Publish the outcome of a persisted, acknowledged scan
    fn announce(&mut self, stores: &Stores, uid: &str, at: Timestamp, outcome: ScanOutcome) {
        match outcome {
            ScanOutcome::SessionOpened { started_at } => {
                tracing::info!(
                    "Session started by professor {} at {}",
                    uid,
                    started_at.format("%H:%M:%S")
                );
                self.try_send_message(BackendMessage::SessionOpened {
                    subject: self.machine.classroom().subject_id.clone(),
                    professor: uid.to_string(),
                    started_at,
                });
            }
            ScanOutcome::SessionClosed(summary) => {
                self.stats.sessions_closed += 1;
                tracing::info!(
                    "Session ended: {} present, avg temp {:?}, avg humid {:?}",
                    summary.present_count,
                    summary.avg_temperature,
                    summary.avg_humidity
                );
                self.try_send_message(BackendMessage::SessionClosed(summary));

                let forecast = stores.history.forecast();
                if let Some(f) = &forecast {
                    tracing::info!("Predicted attendance for next session: {}", f.rounded());
                }
                self.try_send_message(BackendMessage::Prediction(forecast));
            }
            other => {
                if let Some(status) = other.audit_status() {
                    tracing::debug!("{} scanned: {}", uid, status);
                    self.try_send_message(BackendMessage::ScanLogged {
                        date: at.date_naive(),
                        uid: uid.to_string(),
                        status,
                    });
                }
            }
        }
    }

    /// Log and publish a fatal error
    fn fail(&mut self, error: AttendanceError) {
        tracing::error!("Worker halted: {}", error);
        self.update_connection_status(ConnectionStatus::Error);
        self.try_send_message(BackendMessage::Fatal(error.to_string()));
    }

    /// Release the device and report anything left behind
    fn finish(&mut self) {
        if let Some(session) = self.machine.abandon() {
            let present = session.present_count();
            let pending = session.pending_count();
            tracing::warn!(
                "Stopping with session started at {} still open ({} present, {} pending); it was not saved",
                session.started_at.format("%H:%M:%S"),
                present,
                pending
            );
            self.try_send_message(BackendMessage::SessionAbandoned { present, pending });
        }

        self.device.disconnect();
        if self.connection_status != ConnectionStatus::Error {
            self.update_connection_status(ConnectionStatus::Disconnected);
        }

        self.send_stats();
        // Blocks until the frontend drains or drops its receiver
        let _ = self.message_tx.send(BackendMessage::Shutdown);
        tracing::info!("Backend worker stopped");
    }

    /// Update connection status and notify the frontend
    fn update_connection_status(&mut self, status: ConnectionStatus) {
        self.connection_status = status;
        self.try_send_message(BackendMessage::ConnectionStatus(status));
    }

    /// Send statistics to the frontend (using try_send for backpressure)
    fn send_stats(&mut self) {
        self.stats.bytes_received = self.device.stats().bytes_received;
        let stats = self.stats.clone();
        self.try_send_message(BackendMessage::Stats(stats));
    }

    /// Try to send a message, tracking dropped messages if queue is full
    fn try_send_message(&mut self, msg: BackendMessage) {
        if self.message_tx.try_send(msg).is_err() {
            self.stats.dropped_messages += 1;
        }
    }

    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection_status
    }
}

/// Write the record for `outcome`; professor opens have nothing to persist
fn persist(stores: &mut Stores, uid: &str, at: Timestamp, outcome: &ScanOutcome) -> Result<()> {
    match outcome {
        ScanOutcome::SessionOpened { .. } => Ok(()),
        ScanOutcome::SessionClosed(summary) => stores.history.append(summary.clone()),
        other => match other.audit_status() {
            Some(status) => stores
                .audit
                .append(&AuditEntry::new(at.date_naive(), uid, status)),
            None => Ok(()),
        },
    }
}
