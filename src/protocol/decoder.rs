//! Line decoder for the scanner protocol
//!
//! Pure and stateless: the same line and receive time always produce the
//! same [`DeviceEvent`]. Lines are expected to arrive already stripped of
//! their terminator and surrounding whitespace.

use crate::types::Timestamp;

/// Prefix of an identity scan line
pub const IDENTITY_PREFIX: &str = "Student ID: ";

/// Prefix of an environmental sample line
pub const SENSOR_PREFIX: &str = "Temp: ";

/// Exact line the scanner emits when its DHT sensor read fails
pub const SENSOR_FAULT_SENTINEL: &str = "!!!!!!DHT Error!!!!!!";

const TEMPERATURE_END: &str = " C";
const HUMIDITY_START: &str = "Humid: ";
const HUMIDITY_END: &str = " %";

/// A decoded inbound line
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// A card was scanned (professor or student)
    Identity { uid: String, at: Timestamp },
    /// Temperature (°C) and relative humidity (%) sample
    Sensor {
        temperature: f64,
        humidity: f64,
        at: Timestamp,
    },
    /// The scanner reported a sensor read failure
    SensorFault,
    /// Anything that is not part of the protocol
    Malformed(String),
}

impl DeviceEvent {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            DeviceEvent::Identity { .. } => "identity",
            DeviceEvent::Sensor { .. } => "sensor",
            DeviceEvent::SensorFault => "sensor-fault",
            DeviceEvent::Malformed(_) => "malformed",
        }
    }
}

/// Decode one line received at `at`
pub fn decode_line(line: &str, at: Timestamp) -> DeviceEvent {
    if line == SENSOR_FAULT_SENTINEL {
        return DeviceEvent::SensorFault;
    }

    if let Some(uid) = line.strip_prefix(IDENTITY_PREFIX) {
        let uid = uid.trim();
        if uid.is_empty() {
            return DeviceEvent::Malformed(line.to_string());
        }
        return DeviceEvent::Identity {
            uid: uid.to_string(),
            at,
        };
    }

    if line.starts_with(SENSOR_PREFIX) {
        return match parse_sensor(line) {
            Some((temperature, humidity)) => DeviceEvent::Sensor {
                temperature,
                humidity,
                at,
            },
            None => DeviceEvent::Malformed(line.to_string()),
        };
    }

    DeviceEvent::Malformed(line.to_string())
}

/// Extract `(temperature, humidity)` from `Temp: <t> C Humid: <h> %`
fn parse_sensor(line: &str) -> Option<(f64, f64)> {
    let rest = line.strip_prefix(SENSOR_PREFIX)?;
    let (temperature, rest) = rest.split_once(TEMPERATURE_END)?;
    let (_, rest) = rest.split_once(HUMIDITY_START)?;
    let (humidity, _) = rest.split_once(HUMIDITY_END)?;

    Some((parse_finite(temperature)?, parse_finite(humidity)?))
}

fn parse_finite(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
