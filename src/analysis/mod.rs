//! Analysis module for attendance history
//!
//! This module provides the next-session attendance forecast:
//! - Ordinary least-squares linear trend over the full history
//! - Incremental running-sum variant for O(1) updates per closed session

pub mod forecast;

pub use forecast::{forecast_next, Forecast, LinearTrend, TrendAccumulator};
