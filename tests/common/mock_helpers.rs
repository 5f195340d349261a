//! Helpers for running the worker against a scripted device

use super::test_timeout;
use attendance_rs::backend::{BackendMessage, FrontendReceiver};
use std::time::Instant;

#[cfg(feature = "mock-device")]
use attendance_rs::{
    backend::{AttendanceBackend, MockDevice},
    config::AppConfig,
};
#[cfg(feature = "mock-device")]
use std::thread::{self, JoinHandle};

/// Start the worker on its own thread
#[cfg(feature = "mock-device")]
pub fn spawn_backend(config: AppConfig, device: MockDevice) -> (JoinHandle<()>, FrontendReceiver) {
    let (backend, frontend) = AttendanceBackend::new(config, Box::new(device));
    let handle = thread::spawn(move || backend.run());
    (handle, frontend)
}

/// Collect messages until one satisfies `done` (inclusive)
///
/// Panics if the worker goes away or the test timeout passes first.
pub fn collect_until<F>(frontend: &FrontendReceiver, mut done: F) -> Vec<BackendMessage>
where
    F: FnMut(&BackendMessage) -> bool,
{
    let deadline = Instant::now() + test_timeout();
    let mut messages = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let msg = frontend
            .recv_timeout(remaining)
            .unwrap_or_else(|e| panic!("no matching message ({:?}); got {:?}", e, messages));
        let finished = done(&msg);
        messages.push(msg);
        if finished {
            return messages;
        }
    }
}

/// Collect messages until the worker reports it has stopped
pub fn collect_until_shutdown(frontend: &FrontendReceiver) -> Vec<BackendMessage> {
    collect_until(frontend, |msg| matches!(msg, BackendMessage::Shutdown))
}
