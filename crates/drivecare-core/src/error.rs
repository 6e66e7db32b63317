//! Simulator errors

use thiserror::Error;

/// Errors raised while configuring the simulator or persisting history.
///
/// The tick loop and the control surface never surface these to callers;
/// sink failures are logged and the tick carries on.
#[derive(Error, Debug)]
pub enum SimError {
    /// Fewer than two waypoints
    #[error("Route needs at least 2 waypoints, got {0}")]
    RouteTooShort(usize),

    /// Waypoint outside valid latitude/longitude bounds
    #[error("Waypoint {index} out of range: ({latitude}, {longitude})")]
    InvalidWaypoint {
        /// Position in the route
        index: usize,
        /// Offending latitude
        latitude: f64,
        /// Offending longitude
        longitude: f64,
    },

    /// Zero tick interval
    #[error("Tick interval must be greater than zero")]
    InvalidTickInterval,

    /// Malformed config JSON
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// History store lock poisoned or backend down
    #[error("History store unavailable: {0}")]
    HistoryUnavailable(String),

    /// File I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
