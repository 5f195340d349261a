//! Scanner line protocol
//!
//! The scanner speaks a line-oriented ASCII protocol over the serial link.
//! Every inbound line is decoded into exactly one [`DeviceEvent`]; every
//! identity scan that produced an outcome is answered with exactly one
//! [`Ack`] line.
//!
//! # Inbound
//!
//! | Line | Event |
//! |---|---|
//! | `Student ID: <uid>` | [`DeviceEvent::Identity`] |
//! | `Temp: <float> C Humid: <float> %` | [`DeviceEvent::Sensor`] |
//! | `!!!!!!DHT Error!!!!!!` | [`DeviceEvent::SensorFault`] |
//! | anything else | [`DeviceEvent::Malformed`] |
//!
//! # Outbound
//!
//! `Logged_1000`, `Rejected_2000`, `Ignored_1500`, each newline-terminated.

pub mod decoder;
pub mod response;

pub use decoder::{decode_line, DeviceEvent, IDENTITY_PREFIX, SENSOR_FAULT_SENTINEL, SENSOR_PREFIX};
pub use response::Ack;
