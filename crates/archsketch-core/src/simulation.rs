//! Server load model for the request-flow simulation.
//!
//! The simulated rate (requests per second) drives a load percentage, a
//! three-step load level used to tint edges and node glows, a status label,
//! and the duration of one flow animation cycle along an edge.

use crate::editor::SessionSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Requests per second a single simulated server handles at 100% load.
pub const MAX_SERVER_CAPACITY: u32 = 50_000;

/// Load fraction at which the level turns yellow.
pub const WARNING_THRESHOLD: f64 = 0.5;

/// Load fraction at which the level turns red.
pub const CRITICAL_THRESHOLD: f64 = 0.8;

/// Flow cycle at 1 request per second (seconds).
pub const SLOWEST_FLOW_SECS: f64 = 0.666;

/// Flow cycle at [`MAX_SERVER_CAPACITY`] (seconds).
pub const FASTEST_FLOW_SECS: f64 = 0.067;

/// Floor for rates above capacity (seconds).
pub const MIN_FLOW_SECS: f64 = 0.05;

/// Load percentage (0-100 at capacity, more above it), rounded.
pub fn server_load(rate: u32) -> u32 {
    (f64::from(rate) / f64::from(MAX_SERVER_CAPACITY) * 100.0).round() as u32
}

/// Duration of one flow animation cycle, log-scaled between
/// [`SLOWEST_FLOW_SECS`] at 1 rps and [`FASTEST_FLOW_SECS`] at capacity.
pub fn flow_duration(rate: u32) -> Duration {
    let normalized = f64::from(rate.max(1)).ln() / f64::from(MAX_SERVER_CAPACITY).ln();
    let secs = SLOWEST_FLOW_SECS - normalized * (SLOWEST_FLOW_SECS - FASTEST_FLOW_SECS);
    Duration::from_secs_f64(secs.max(MIN_FLOW_SECS))
}

/// Colour band of the simulated load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoadLevel {
    #[default]
    Blue,
    Yellow,
    Red,
}

impl LoadLevel {
    /// Level for a rate, compared on the unrounded load fraction.
    pub fn from_rate(rate: u32) -> Self {
        let fraction = f64::from(rate) / f64::from(MAX_SERVER_CAPACITY);
        if fraction >= CRITICAL_THRESHOLD {
            LoadLevel::Red
        } else if fraction >= WARNING_THRESHOLD {
            LoadLevel::Yellow
        } else {
            LoadLevel::Blue
        }
    }

    /// Animation speed multiplier relative to the blue band.
    pub fn speed(self) -> f64 {
        match self {
            LoadLevel::Blue => 1.0,
            LoadLevel::Yellow => 1.33,
            LoadLevel::Red => 2.0,
        }
    }
}

/// Status label shown next to the load percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServerStatus {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl ServerStatus {
    /// Status for a rounded load percentage from [`server_load`].
    pub fn from_load(percent: u32) -> Self {
        let percent = f64::from(percent);
        if percent >= CRITICAL_THRESHOLD * 100.0 {
            ServerStatus::Critical
        } else if percent >= WARNING_THRESHOLD * 100.0 {
            ServerStatus::Warning
        } else {
            ServerStatus::Normal
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ServerStatus::Normal => "NORMAL",
            ServerStatus::Warning => "WARNING",
            ServerStatus::Critical => "CRITICAL",
        }
    }
}

/// Everything the host needs to draw the simulation for one rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadReport {
    pub rate: u32,
    pub running: bool,
    pub load_percent: u32,
    pub level: LoadLevel,
    pub status: ServerStatus,
    pub flow_duration: Duration,
}

impl LoadReport {
    pub fn from_session(session: &SessionSettings) -> Self {
        let rate = session.simulation_rate;
        let load_percent = server_load(rate);
        Self {
            rate,
            running: session.run_flag,
            load_percent,
            level: LoadLevel::from_rate(rate),
            status: ServerStatus::from_load(load_percent),
            flow_duration: flow_duration(rate),
        }
    }

    /// Whether edges should animate at all.
    pub fn animates(&self) -> bool {
        self.running && self.rate > 0
    }
}
