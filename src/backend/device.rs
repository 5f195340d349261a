//! Scanner transports
//!
//! [`SerialDevice`] reads the scanner's line stream from a serial port
//! (`/dev/ttyUSB0`, opened at the configured baud rate, 8N1, no flow
//! control), a TCP serial bridge (`tcp://host:port`), or a recorded
//! capture file (`file:capture.txt`, acks are discarded).
//!
//! A reader thread splits incoming bytes on `\n`, decodes them as lossy
//! UTF-8, trims them, and forwards them over a channel. The worker waits
//! on that channel with a timeout, which is its only blocking point.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use serialport::{DataBits, FlowControl, Parity, StopBits};

use crate::config::{DeviceConfig, DEFAULT_BAUD_RATE};
use crate::error::{AttendanceError, Result, ResultExt};

use super::device_trait::{DeviceLink, LinkStats};

/// Address prefix for TCP serial bridges
pub const TCP_SCHEME: &str = "tcp://";

/// Address prefix for replaying a captured line stream
pub const FILE_SCHEME: &str = "file:";

/// Serial read timeout; the reader thread checks for shutdown this often
const SERIAL_READ_POLL: Duration = Duration::from_millis(100);

/// Address prefix for the scripted mock device
pub const MOCK_SCHEME: &str = "mock:";

/// Parsed form of `device.address`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceAddress {
    /// Serial port device node
    Serial(PathBuf),
    /// Captured scanner output replayed line by line
    File(PathBuf),
    /// `host:port` of a serial-over-TCP bridge
    Tcp(String),
    /// Scripted device, replaying the given file or a built-in demo
    Mock(Option<PathBuf>),
}

impl DeviceAddress {
    pub fn parse(address: &str) -> Result<Self> {
        let address = address.trim();
        if address.is_empty() {
            return Err(AttendanceError::Config(
                "device address must not be empty".to_string(),
            ));
        }

        if let Some(host) = address.strip_prefix(TCP_SCHEME) {
            if host.is_empty() {
                return Err(AttendanceError::Config(format!(
                    "missing host in device address {:?}",
                    address
                )));
            }
            return Ok(DeviceAddress::Tcp(host.to_string()));
        }

        if let Some(path) = address.strip_prefix(FILE_SCHEME) {
            let path = path.trim();
            if path.is_empty() {
                return Err(AttendanceError::Config(format!(
                    "missing path in device address {:?}",
                    address
                )));
            }
            return Ok(DeviceAddress::File(PathBuf::from(path)));
        }

        if let Some(path) = address.strip_prefix(MOCK_SCHEME) {
            let path = path.trim();
            return Ok(DeviceAddress::Mock(
                (!path.is_empty()).then(|| PathBuf::from(path)),
            ));
        }

        Ok(DeviceAddress::Serial(PathBuf::from(address)))
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceAddress::Serial(path) => write!(f, "{}", path.display()),
            DeviceAddress::File(path) => write!(f, "{}{}", FILE_SCHEME, path.display()),
            DeviceAddress::Tcp(host) => write!(f, "{}{}", TCP_SCHEME, host),
            DeviceAddress::Mock(Some(path)) => write!(f, "{}{}", MOCK_SCHEME, path.display()),
            DeviceAddress::Mock(None) => write!(f, "{}demo", MOCK_SCHEME),
        }
    }
}

/// Build the link for the configured device section
pub fn open_device(config: &DeviceConfig) -> Result<Box<dyn DeviceLink>> {
    match DeviceAddress::parse(&config.address)? {
        DeviceAddress::Mock(script) => open_mock(script),
        other => Ok(Box::new(
            SerialDevice::new(other).with_baud_rate(config.baud_rate),
        )),
    }
}

#[cfg(feature = "mock-device")]
fn open_mock(script: Option<PathBuf>) -> Result<Box<dyn DeviceLink>> {
    use super::mock_device::MockDevice;

    let device = match script {
        Some(path) => MockDevice::from_file(&path)?,
        None => MockDevice::demo(),
    };
    Ok(Box::new(device))
}

#[cfg(not(feature = "mock-device"))]
fn open_mock(_script: Option<PathBuf>) -> Result<Box<dyn DeviceLink>> {
    Err(AttendanceError::Config(
        "mock devices require the `mock-device` feature".to_string(),
    ))
}

/// What the reader thread forwards to the worker
#[derive(Debug)]
enum ReaderEvent {
    /// A trimmed line and its raw length in bytes
    Line(String, usize),
    /// The stream reached end of file
    Closed,
    /// The stream failed
    Failed(io::Error),
}

/// Scanner connected through a serial port, a TCP bridge, or a capture file
pub struct SerialDevice {
    address: DeviceAddress,
    baud_rate: u32,
    writer: Option<Box<dyn Write + Send>>,
    lines: Option<Receiver<ReaderEvent>>,
    tcp: Option<TcpStream>,
    stop_reader: Arc<AtomicBool>,
    stats: LinkStats,
}

impl SerialDevice {
    pub fn new(address: DeviceAddress) -> Self {
        Self {
            address,
            baud_rate: DEFAULT_BAUD_RATE,
            writer: None,
            lines: None,
            tcp: None,
            stop_reader: Arc::new(AtomicBool::new(false)),
            stats: LinkStats::default(),
        }
    }

    /// Line speed used when the address is a serial port
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Parse `address` and create an unconnected device
    pub fn from_address(address: &str) -> Result<Self> {
        Ok(Self::new(DeviceAddress::parse(address)?))
    }

    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    fn open_streams(&mut self) -> Result<(Box<dyn Read + Send>, Box<dyn Write + Send>)> {
        match &self.address {
            DeviceAddress::Serial(path) => {
                let port = serialport::new(path.to_string_lossy(), self.baud_rate)
                    .data_bits(DataBits::Eight)
                    .parity(Parity::None)
                    .stop_bits(StopBits::One)
                    .flow_control(FlowControl::None)
                    .timeout(SERIAL_READ_POLL)
                    .open()
                    .map_err(io::Error::from)
                    .with_context(|| {
                        format!(
                            "Failed to open serial port {} at {} baud",
                            path.display(),
                            self.baud_rate
                        )
                    })?;
                let reader = port.try_clone().map_err(io::Error::from)?;
                Ok((Box::new(reader), Box::new(port)))
            }
            DeviceAddress::File(path) => {
                let file = File::open(path)
                    .with_context(|| format!("Failed to open capture {}", path.display()))?;
                Ok((Box::new(file), Box::new(io::sink())))
            }
            DeviceAddress::Tcp(host) => {
                let stream = TcpStream::connect(host.as_str())
                    .with_context(|| format!("Failed to connect to {}", host))?;
                stream.set_nodelay(true)?;
                let reader = stream.try_clone()?;
                let writer = stream.try_clone()?;
                self.tcp = Some(stream);
                Ok((Box::new(reader), Box::new(writer)))
            }
            DeviceAddress::Mock(_) => Err(AttendanceError::Device(
                "mock addresses are not serial devices".to_string(),
            )),
        }
    }

    fn mark_disconnected(&mut self) {
        self.stop_reader.store(true, Ordering::Relaxed);
        self.writer = None;
        self.lines = None;
        if let Some(stream) = self.tcp.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

impl fmt::Debug for SerialDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialDevice")
            .field("address", &self.address)
            .field("connected", &self.is_connected())
            .field("stats", &self.stats)
            .finish()
    }
}

impl DeviceLink for SerialDevice {
    fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        let (reader, writer) = self.open_streams()?;
        let (tx, rx) = unbounded();
        let stop = Arc::new(AtomicBool::new(false));
        self.stop_reader = Arc::clone(&stop);

        std::thread::Builder::new()
            .name("device-reader".to_string())
            .spawn(move || read_lines(reader, tx, stop))
            .context("Failed to spawn device reader thread")?;

        self.writer = Some(writer);
        self.lines = Some(rx);
        self.stats.reset();
        match &self.address {
            DeviceAddress::Serial(_) => tracing::info!(
                "Connected to scanner at {} ({} baud)",
                self.address,
                self.baud_rate
            ),
            _ => tracing::info!("Connected to scanner at {}", self.address),
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.is_connected() {
            tracing::info!("Disconnected from scanner at {}", self.address);
        }
        self.mark_disconnected();
    }

    fn is_connected(&self) -> bool {
        self.writer.is_some() && self.lines.is_some()
    }

    fn read_line(&mut self, timeout: Duration) -> Result<Option<String>> {
        let Some(lines) = self.lines.as_ref() else {
            return Err(AttendanceError::Device("not connected".to_string()));
        };

        match lines.recv_timeout(timeout) {
            Ok(ReaderEvent::Line(line, bytes)) => {
                self.stats.record_received(bytes);
                Ok(Some(line))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Ok(ReaderEvent::Failed(e)) => {
                self.mark_disconnected();
                Err(AttendanceError::Io(e).with_context(format!("Reading from {}", self.address)))
            }
            Ok(ReaderEvent::Closed) | Err(RecvTimeoutError::Disconnected) => {
                self.mark_disconnected();
                Err(AttendanceError::DeviceDisconnected)
            }
        }
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(AttendanceError::Device("not connected".to_string()));
        };

        let result = writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .and_then(|_| writer.flush());

        match result {
            Ok(()) => {
                self.stats.record_sent();
                Ok(())
            }
            Err(e) => {
                let kind = e.kind();
                self.mark_disconnected();
                if matches!(
                    kind,
                    io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset
                ) {
                    Err(AttendanceError::DeviceDisconnected)
                } else {
                    Err(AttendanceError::Io(e).with_context(format!("Writing to {}", self.address)))
                }
            }
        }
    }

    fn stats(&self) -> LinkStats {
        self.stats
    }

    fn describe(&self) -> String {
        self.address.to_string()
    }
}

/// Reader thread body: forward lines until EOF, error, or the worker hangs up
fn read_lines(reader: Box<dyn Read + Send>, tx: Sender<ReaderEvent>, stop: Arc<AtomicBool>) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(128);

    loop {
        // A serial read timeout keeps the partial line in `buf`
        let event = match reader.read_until(b'\n', &mut buf) {
            Ok(0) if buf.is_empty() => ReaderEvent::Closed,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).trim().to_string();
                let bytes = buf.len();
                buf.clear();
                ReaderEvent::Line(line, bytes)
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                continue;
            }
            Err(e) => ReaderEvent::Failed(e),
        };

        let done = !matches!(event, ReaderEvent::Line(..));
        if tx.send(event).is_err() || done {
            break;
        }
    }
    tracing::debug!("Device reader thread finished");
}
