//! RFID Attendance System - Main Entry Point
//!
//! Runs the attendance worker against the configured scanner and prints the
//! status surface to the console until Ctrl-C or a fatal error.

use anyhow::{anyhow, Context};
use attendance_rs::{
    backend::{open_device, AttendanceBackend, BackendCommand, BackendMessage},
    config::{ensure_dir, AppConfig},
    frontend::{render_history_table, render_status_bar, AttendanceView},
    types::ConnectionStatus,
};
use clap::Parser;
use crossbeam_channel::{RecvTimeoutError, Sender};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How long the console waits for a message before checking again
const UI_TICK: Duration = Duration::from_millis(100);

/// Rolling log file name prefix inside the data directory
const LOG_FILE_PREFIX: &str = "attendance.log";

#[derive(Parser, Debug)]
#[command(author, version, about = "RFID Attendance System", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, default_value = "attendance.toml")]
    config: PathBuf,

    /// Scanner address: device path, tcp://host:port, file:path, or mock:[path]
    #[arg(short, long)]
    device: Option<String>,

    /// Serial line speed for device paths
    #[arg(long)]
    baud_rate: Option<u32>,

    /// Professor UID that opens and closes sessions
    #[arg(long)]
    professor: Option<String>,

    /// Subject recorded with each session
    #[arg(long)]
    subject: Option<String>,

    /// Directory for the CSV files and the log file
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "info,attendance_rs=trace"
    #[arg(long)]
    log_level: Option<String>,

    /// Write the effective configuration to this path and exit
    #[arg(long)]
    write_config: Option<PathBuf>,
}

impl Args {
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(device) = &self.device {
            config.device.address = device.clone();
        }
        if let Some(baud_rate) = self.baud_rate {
            config.device.baud_rate = baud_rate;
        }
        if let Some(professor) = &self.professor {
            config.classroom.professor_uid = professor.clone();
        }
        if let Some(subject) = &self.subject {
            config.classroom.subject_id = subject.clone();
        }
        config.classroom.normalize();
        if let Some(dir) = &self.data_dir {
            config.storage.data_dir = Some(dir.clone());
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load_or_default(&args.config)
        .with_context(|| format!("Failed to load {:?}", args.config))?;
    args.apply_overrides(&mut config);

    if let Some(path) = &args.write_config {
        config.save(path)?;
        println!("Wrote configuration to {:?}", path);
        return Ok(());
    }

    let data_dir = config.storage.base_dir();
    ensure_dir(&data_dir)?;

    // Initialize logging; the guard flushes the file writer on exit
    let file_appender = tracing_appender::rolling::daily(&data_dir, LOG_FILE_PREFIX);
    let (file_writer, _log_guard) = tracing_appender::non_blocking(file_appender);
    let filter = match &args.log_level {
        Some(level) => EnvFilter::try_new(level).context("Invalid --log-level")?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,attendance_rs=debug")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    config.validate()?;
    tracing::info!(
        "Starting RFID Attendance System (professor {}, subject {}, data in {:?})",
        config.classroom.professor_uid,
        config.classroom.subject_id,
        data_dir
    );

    let device = open_device(&config.device)?;
    let (backend, frontend) = AttendanceBackend::new(config, device);
    let worker = std::thread::Builder::new()
        .name("attendance-worker".to_string())
        .spawn(move || backend.run())
        .context("Failed to spawn worker thread")?;

    spawn_ctrl_c_handler(frontend.command_sender.clone())?;
    frontend.request_history();

    let mut view = AttendanceView::new();
    println!("{}", render_status_bar(&view));
    while !view.shut_down {
        match frontend.recv_timeout(UI_TICK) {
            Ok(msg) => {
                view.apply(msg.clone());
                present(&view, &msg);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    worker
        .join()
        .map_err(|_| anyhow!("Worker thread panicked"))?;
    tracing::info!("Shut down");

    match (&view.last_error, view.connection_status) {
        (Some(error), ConnectionStatus::Error) => Err(anyhow!("{}", error)),
        _ => Ok(()),
    }
}

/// Forward Ctrl-C to the worker as a shutdown command
fn spawn_ctrl_c_handler(commands: Sender<BackendCommand>) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("Failed to start signal runtime")?;

    std::thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            runtime.block_on(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for Ctrl-C: {}", e);
                    return;
                }
                tracing::info!("Shutdown signal received");
                let _ = commands.send(BackendCommand::Shutdown);
            });
        })
        .context("Failed to spawn signal thread")?;
    Ok(())
}

/// Print the part of the view that `msg` changed
fn present(view: &AttendanceView, msg: &BackendMessage) {
    match msg {
        BackendMessage::ScanLogged { .. } | BackendMessage::SessionAbandoned { .. } => {
            if let Some(line) = view.log.back() {
                println!("{}", line);
            }
        }
        BackendMessage::Environment { .. } | BackendMessage::SensorFault => {
            println!("{}", view.environment_text());
        }
        BackendMessage::Prediction(_) => println!("{}", view.prediction_text()),
        BackendMessage::History(rows) => print!("{}", render_history_table(rows)),
        BackendMessage::SessionOpened { .. }
        | BackendMessage::SessionClosed(_)
        | BackendMessage::ConnectionStatus(_)
        | BackendMessage::Stats(_)
        | BackendMessage::Fatal(_) => println!("{}", render_status_bar(view)),
        BackendMessage::ConnectionError(error) => eprintln!("Connection error: {}", error),
        BackendMessage::MalformedLine(line) => eprintln!("Unrecognized line: {:?}", line),
        BackendMessage::EnvironmentDiscarded | BackendMessage::Shutdown => {}
    }
}
