//! Presentation layer
//!
//! The frontend never reads or writes attendance state directly. It folds
//! [`BackendMessage`](crate::backend::BackendMessage)s into an
//! [`AttendanceView`] and renders that view as console text.
//!
//! - [`state`] - the view model
//! - [`status_bar`] - text rendering of the view

pub mod state;
pub mod status_bar;

pub use state::{AttendanceView, EnvironmentReading, DEFAULT_SCROLLBACK};
pub use status_bar::{render_history_table, render_stats, render_status_bar};
