//! Configuration module for attendance-rs
//!
//! All settings are fixed at process start. They come from a TOML file
//! (optional) with command line overrides applied on top by the binary.
//!
//! # Data Location
//!
//! Unless `storage.data_dir` is set, the CSV files and the rolling log are
//! kept in the platform-appropriate data directory under `dev.attendance-rs`:
//!
//! - **Linux**: `~/.local/share/dev.attendance-rs/`
//! - **macOS**: `~/Library/Application Support/dev.attendance-rs/`
//! - **Windows**: `%APPDATA%\dev.attendance-rs\`
//!
//! # Example
//!
//! ```toml
//! [classroom]
//! professor_uid = "PROF1234"
//! subject_id = "EE-396"
//!
//! [device]
//! address = "/dev/ttyUSB0"
//! poll_interval_ms = 10
//!
//! [storage]
//! attendance_log = "attendance_log.csv"
//! session_history = "session_data.csv"
//! ```

use crate::error::{AttendanceError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for data directories
pub const APP_ID: &str = "dev.attendance-rs";

/// Default professor identity
pub const DEFAULT_PROFESSOR_UID: &str = "PROF1234";

/// Default subject identifier
pub const DEFAULT_SUBJECT_ID: &str = "EE-396";

/// Default scanner device
pub const DEFAULT_DEVICE_ADDRESS: &str = "/dev/ttyUSB0";

/// Default serial line speed of the scanner firmware
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default wait for the next device line in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Default audit log file name
pub const DEFAULT_ATTENDANCE_LOG: &str = "attendance_log.csv";

/// Default session history file name
pub const DEFAULT_SESSION_HISTORY: &str = "session_data.csv";

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure a directory exists, creating it if needed
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| {
            AttendanceError::Config(format!("Failed to create directory {:?}: {}", dir, e))
        })?;
    }
    Ok(())
}

// ==================== App Config ====================

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    /// Who opens sessions and what is being taught
    #[serde(default)]
    pub classroom: ClassroomConfig,

    /// Scanner link settings
    #[serde(default)]
    pub device: DeviceConfig,

    /// Where the audit log and history table live
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AttendanceError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| {
            AttendanceError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;
        config.classroom.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, returning defaults if it does not exist
    ///
    /// A file that exists but cannot be parsed is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save configuration to disk as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_dir(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| AttendanceError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            AttendanceError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Reject configurations the worker cannot run with
    pub fn validate(&self) -> Result<()> {
        let professor = &self.classroom.professor_uid;
        if professor.trim().is_empty() {
            return Err(AttendanceError::Config(
                "classroom.professor_uid must not be empty".to_string(),
            ));
        }
        // Scanned UIDs arrive trimmed, so padding here could never match
        if professor.trim() != professor {
            return Err(AttendanceError::Config(format!(
                "classroom.professor_uid {:?} has surrounding whitespace",
                professor
            )));
        }
        if self.device.address.trim().is_empty() {
            return Err(AttendanceError::Config(
                "device.address must not be empty".to_string(),
            ));
        }
        if self.device.baud_rate == 0 {
            return Err(AttendanceError::Config(
                "device.baud_rate must be positive".to_string(),
            ));
        }
        if self.device.poll_interval_ms == 0 {
            return Err(AttendanceError::Config(
                "device.poll_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ==================== Classroom Config ====================

/// Identity of the session owner and the subject
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassroomConfig {
    /// UID whose scans open and close sessions
    #[serde(default = "default_professor_uid")]
    pub professor_uid: String,

    /// Subject recorded in every session summary
    #[serde(default = "default_subject_id")]
    pub subject_id: String,
}

fn default_professor_uid() -> String {
    DEFAULT_PROFESSOR_UID.to_string()
}

fn default_subject_id() -> String {
    DEFAULT_SUBJECT_ID.to_string()
}

impl Default for ClassroomConfig {
    fn default() -> Self {
        Self {
            professor_uid: default_professor_uid(),
            subject_id: default_subject_id(),
        }
    }
}

impl ClassroomConfig {
    pub fn new(professor_uid: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self {
            professor_uid: professor_uid.into(),
            subject_id: subject_id.into(),
        }
    }

    /// Strip surrounding whitespace from both identifiers
    pub fn normalize(&mut self) {
        self.professor_uid = self.professor_uid.trim().to_string();
        self.subject_id = self.subject_id.trim().to_string();
    }
}

// ==================== Device Config ====================

/// Scanner link configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    /// Device node (e.g. `/dev/ttyUSB0`), `tcp://host:port`, `file:<capture>`,
    /// or `mock:<file>`
    #[serde(default = "default_device_address")]
    pub address: String,

    /// Line speed for device nodes (8 data bits, no parity, 1 stop bit)
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// How long the worker waits for a line before checking for commands
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_device_address() -> String {
    DEFAULT_DEVICE_ADDRESS.to_string()
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: default_device_address(),
            baud_rate: DEFAULT_BAUD_RATE,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl DeviceConfig {
    /// Poll interval as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

// ==================== Storage Config ====================

/// Locations of the persisted CSV files
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Base directory for relative file names (platform data dir when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Append-only per-scan audit log
    #[serde(default = "default_attendance_log")]
    pub attendance_log: PathBuf,

    /// Session history table, rewritten on every close
    #[serde(default = "default_session_history")]
    pub session_history: PathBuf,
}

fn default_attendance_log() -> PathBuf {
    PathBuf::from(DEFAULT_ATTENDANCE_LOG)
}

fn default_session_history() -> PathBuf {
    PathBuf::from(DEFAULT_SESSION_HISTORY)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            attendance_log: default_attendance_log(),
            session_history: default_session_history(),
        }
    }
}

impl StorageConfig {
    /// Storage rooted at `dir` with the default file names
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(dir.into()),
            ..Default::default()
        }
    }

    /// Directory that relative file names resolve against
    pub fn base_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(app_data_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Resolved path of the audit log
    pub fn attendance_log_path(&self) -> PathBuf {
        self.resolve(&self.attendance_log)
    }

    /// Resolved path of the history table
    pub fn session_history_path(&self) -> PathBuf {
        self.resolve(&self.session_history)
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.base_dir().join(file)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.classroom.professor_uid, "PROF1234");
        assert_eq!(config.classroom.subject_id, "EE-396");
        assert_eq!(config.device.poll_interval(), Duration::from_millis(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [classroom]
            professor_uid = "PROF9"
            "#,
        )
        .unwrap();

        assert_eq!(config.classroom.professor_uid, "PROF9");
        assert_eq!(config.classroom.subject_id, DEFAULT_SUBJECT_ID);
        assert_eq!(config.device, DeviceConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("attendance.toml");

        let mut config = AppConfig::default();
        config.classroom = ClassroomConfig::new("PROF77", "CS-101");
        config.device.address = "tcp://127.0.0.1:7000".to_string();
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[classroom\nprofessor_uid = ").unwrap();
        assert!(matches!(
            AppConfig::load_or_default(&path),
            Err(AttendanceError::Config(_))
        ));
    }

    #[test]
    fn test_load_trims_classroom_identifiers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance.toml");
        std::fs::write(
            &path,
            "[classroom]\nprofessor_uid = \" PROF9 \"\nsubject_id = \"CS-101 \"\n",
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.classroom.professor_uid, "PROF9");
        assert_eq!(config.classroom.subject_id, "CS-101");
    }

    #[test]
    fn test_validate_rejects_padded_professor() {
        let mut config = AppConfig::default();
        config.classroom.professor_uid = "PROF9 ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("surrounding whitespace"));

        config.classroom.normalize();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_baud_rate() {
        let mut config = AppConfig::default();
        assert_eq!(config.device.baud_rate, 9600);
        config.device.baud_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_professor() {
        let mut config = AppConfig::default();
        config.classroom.professor_uid = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_paths_resolve_against_data_dir() {
        let storage = StorageConfig::in_dir("/srv/attendance");
        assert_eq!(
            storage.attendance_log_path(),
            PathBuf::from("/srv/attendance/attendance_log.csv")
        );
        assert_eq!(
            storage.session_history_path(),
            PathBuf::from("/srv/attendance/session_data.csv")
        );

        let absolute = StorageConfig {
            session_history: PathBuf::from("/tmp/history.csv"),
            ..StorageConfig::in_dir("/srv/attendance")
        };
        assert_eq!(
            absolute.session_history_path(),
            PathBuf::from("/tmp/history.csv")
        );
    }
}
