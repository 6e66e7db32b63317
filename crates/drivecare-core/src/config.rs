//! Simulator configuration
//!
//! Stored as JSON. Every field is optional in the file; missing fields fall
//! back to the defaults below.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::DEFAULT_VEHICLE_ID;
use crate::route::{Coordinate, RouteTable};
use crate::SimError;

/// Default tick interval in milliseconds
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Default number of history records kept in memory
pub const DEFAULT_HISTORY_CAPACITY: usize = 10_000;

/// Default broadcast channel depth
pub const DEFAULT_BROADCAST_CAPACITY: usize = 16;

/// Simulator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulatorConfig {
    /// Identifier stamped on every snapshot and history record
    pub vehicle_id: String,
    /// Time between ticks in milliseconds
    pub tick_interval_ms: u64,
    /// Records kept by the in-memory history store
    pub history_capacity: usize,
    /// Snapshots buffered per broadcast subscriber
    pub broadcast_capacity: usize,
    /// Label reported as the navigation destination
    pub destination_label: String,
    /// Label reported for the upcoming maneuver
    pub next_turn_label: String,
    /// Route override; the built-in Seoul route is used when absent
    pub route: Option<Vec<Coordinate>>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            vehicle_id: DEFAULT_VEHICLE_ID.to_string(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            destination_label: "Gangnam Station".to_string(),
            next_turn_label: "Turn right".to_string(),
            route: None,
        }
    }
}

impl SimulatorConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self, SimError> {
        let config: SimulatorConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the tick loop cannot run with
    pub fn validate(&self) -> Result<(), SimError> {
        if self.tick_interval_ms == 0 {
            return Err(SimError::InvalidTickInterval);
        }
        self.route_table().map(|_| ())
    }

    /// Tick interval as a [`Duration`]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// The route to drive
    pub fn route_table(&self) -> Result<RouteTable, SimError> {
        match &self.route {
            Some(waypoints) => RouteTable::new(waypoints.clone()),
            None => Ok(RouteTable::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = SimulatorConfig::from_json(r#"{ "tickIntervalMs": 500 }"#).unwrap();
        assert_eq!(config.tick_interval(), Duration::from_millis(500));
        assert_eq!(config.vehicle_id, DEFAULT_VEHICLE_ID);
        assert_eq!(config.history_capacity, DEFAULT_HISTORY_CAPACITY);
        assert_eq!(config.route_table().unwrap().len(), 70);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = SimulatorConfig::from_json(r#"{ "tickIntervalMs": 0 }"#).unwrap_err();
        assert!(matches!(err, SimError::InvalidTickInterval));
    }

    #[test]
    fn test_route_override() {
        let json = r#"{
            "route": [
                { "latitude": 10.0, "longitude": 20.0 },
                { "latitude": 10.5, "longitude": 20.5 }
            ]
        }"#;
        let config = SimulatorConfig::from_json(json).unwrap();
        let route = config.route_table().unwrap();
        assert_eq!(route.len(), 2);
        assert_eq!(route.origin(), Coordinate::new(10.0, 20.0));
    }

    #[test]
    fn test_short_route_rejected() {
        let json = r#"{ "route": [ { "latitude": 1.0, "longitude": 2.0 } ] }"#;
        assert!(matches!(
            SimulatorConfig::from_json(json),
            Err(SimError::RouteTooShort(1))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "vehicleId": "test_car" }}"#).unwrap();

        let config = SimulatorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.vehicle_id, "test_car");
        assert_eq!(config.tick_interval_ms, DEFAULT_TICK_INTERVAL_MS);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            SimulatorConfig::from_json("{ nope"),
            Err(SimError::ConfigParse(_))
        ));
    }
}
