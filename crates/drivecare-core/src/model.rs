//! Vehicle status model
//!
//! The snapshot published on every tick. Field names serialize in camelCase so
//! dashboard clients can consume the JSON directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::route::Coordinate;

/// Identifier reported for the single simulated vehicle
pub const DEFAULT_VEHICLE_ID: &str = "vehicle_001";

/// Media volume bounds
pub const VOLUME_RANGE: (i32, i32) = (0, 100);
/// Climate set-point bounds in °C
pub const CLIMATE_TEMPERATURE_RANGE: (f64, f64) = (16.0, 30.0);
/// Climate fan speed bounds
pub const FAN_SPEED_RANGE: (i32, i32) = (1, 5);
/// Fuel level bounds in percent
pub const FUEL_LEVEL_RANGE: (f64, f64) = (0.0, 100.0);

/// Warning raised when fuel drops below 10 %
pub const WARNING_LOW_FUEL: &str = "low fuel";
/// Warning raised above 105 °C coolant
pub const WARNING_ENGINE_OVERHEAT: &str = "engine overheat";
/// Warning raised below 12 V
pub const WARNING_BATTERY_LOW: &str = "battery low";

/// GPS fix for the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Altitude in meters
    pub altitude: f64,
    /// Heading in degrees, see [`crate::geo::bearing_degrees`]
    pub heading: f64,
    /// Accuracy radius in meters
    pub accuracy: f64,
}

impl Location {
    /// Fix at `coord` with no heading and the default 5 m accuracy
    pub fn at(coord: Coordinate) -> Self {
        Self {
            latitude: coord.latitude,
            longitude: coord.longitude,
            altitude: 0.0,
            heading: 0.0,
            accuracy: 5.0,
        }
    }

    /// The latitude/longitude part of the fix
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

impl Default for Location {
    fn default() -> Self {
        // Seoul City Hall
        Self::at(Coordinate::new(37.5665, 126.9780))
    }
}

/// Transmission position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gear {
    /// Parked
    #[default]
    #[serde(rename = "P")]
    Park,
    /// Driving
    #[serde(rename = "D")]
    Drive,
}

impl Gear {
    /// Single-letter label shown on the dash
    pub fn as_str(&self) -> &'static str {
        match self {
            Gear::Park => "P",
            Gear::Drive => "D",
        }
    }
}

/// Engine, fuel, battery and trip data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleData {
    /// Vehicle identifier
    pub id: String,
    /// Speed in km/h
    pub speed: f64,
    /// Engine RPM
    pub rpm: u32,
    /// Fuel level in percent
    pub fuel_level: f64,
    /// Coolant temperature in °C
    pub engine_temperature: f64,
    /// Battery voltage
    pub battery_voltage: f64,
    /// Current GPS fix
    pub location: Location,
    /// When this sample was taken
    pub timestamp: DateTime<Utc>,
    /// Whether the engine is running
    pub is_engine_running: bool,
    /// Transmission position
    pub gear_position: Gear,
    /// Total distance in km, never decreases
    pub odometer: f64,
    /// Distance since process start in km
    pub trip_distance: f64,
    /// Average trip speed in km/h
    pub average_speed: f64,
    /// Instantaneous fuel consumption rate
    pub fuel_consumption: f64,
}

impl Default for VehicleData {
    fn default() -> Self {
        Self {
            id: DEFAULT_VEHICLE_ID.to_string(),
            speed: 0.0,
            rpm: 0,
            fuel_level: 100.0,
            engine_temperature: 90.0,
            battery_voltage: 12.6,
            location: Location::default(),
            timestamp: Utc::now(),
            is_engine_running: false,
            gear_position: Gear::Park,
            odometer: 0.0,
            trip_distance: 0.0,
            average_speed: 0.0,
            fuel_consumption: 0.0,
        }
    }
}

/// Infotainment state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    /// Whether playback is running
    pub is_playing: bool,
    /// Track title
    pub current_track: String,
    /// Track artist
    pub artist: String,
    /// Track album
    pub album: String,
    /// Track length in seconds
    pub duration: u32,
    /// Playback position in seconds
    pub current_time: u32,
    /// Volume, 0-100
    pub volume: i32,
    /// Audio source (Bluetooth, USB, Radio...)
    pub source: String,
}

impl MediaInfo {
    /// Advance playback by one second, wrapping at the end of the track
    pub fn advance(&mut self) {
        if self.is_playing && self.duration > 0 {
            self.current_time = (self.current_time + 1) % self.duration;
        }
    }
}

impl Default for MediaInfo {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_track: "Shape of You".to_string(),
            artist: "Ed Sheeran".to_string(),
            album: "÷ (Divide)".to_string(),
            duration: 233,
            current_time: 0,
            volume: 50,
            source: "Bluetooth".to_string(),
        }
    }
}

/// HVAC operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClimateMode {
    /// Automatic temperature control
    #[default]
    Auto,
    /// Manual fan/temperature
    Manual,
    /// Windshield defrost
    Defrost,
}

impl ClimateMode {
    /// Next mode in the Auto → Manual → Defrost → Auto cycle
    pub fn next(self) -> Self {
        match self {
            ClimateMode::Auto => ClimateMode::Manual,
            ClimateMode::Manual => ClimateMode::Defrost,
            ClimateMode::Defrost => ClimateMode::Auto,
        }
    }
}

/// HVAC state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimateControl {
    /// Whether the system is on
    pub is_enabled: bool,
    /// Set point in °C
    pub temperature: f64,
    /// Fan speed, 1-5
    pub fan_speed: i32,
    /// Operating mode
    pub mode: ClimateMode,
    /// Air conditioning
    pub is_ac_on: bool,
    /// Heater
    pub is_heat_on: bool,
    /// Defroster
    pub is_defrost_on: bool,
}

impl Default for ClimateControl {
    fn default() -> Self {
        Self {
            is_enabled: false,
            temperature: 22.0,
            fan_speed: 2,
            mode: ClimateMode::Auto,
            is_ac_on: false,
            is_heat_on: false,
            is_defrost_on: false,
        }
    }
}

/// Turn-by-turn navigation state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationInfo {
    /// Whether guidance is active
    pub is_active: bool,
    /// Destination label
    pub destination: String,
    /// Minutes to destination
    pub estimated_time: u32,
    /// Kilometers to destination
    pub remaining_distance: f64,
    /// Waypoints of the route being followed
    pub current_route: Vec<Coordinate>,
    /// Next maneuver label
    pub next_turn: String,
    /// Kilometers to the next maneuver
    pub next_turn_distance: f64,
}

/// Complete vehicle snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleStatus {
    /// Engine, fuel and trip data
    pub vehicle_data: VehicleData,
    /// Infotainment
    pub media_info: MediaInfo,
    /// HVAC
    pub climate_control: ClimateControl,
    /// Navigation
    pub navigation_info: NavigationInfo,
    /// Active warning labels
    pub warnings: Vec<String>,
    /// When this snapshot was assembled
    pub timestamp: DateTime<Utc>,
}

impl VehicleStatus {
    /// Resting snapshot: engine off, parked at `origin`
    pub fn at_rest(vehicle_id: &str, origin: Coordinate, now: DateTime<Utc>) -> Self {
        Self {
            vehicle_data: VehicleData {
                id: vehicle_id.to_string(),
                location: Location::at(origin),
                timestamp: now,
                ..VehicleData::default()
            },
            media_info: MediaInfo::default(),
            climate_control: ClimateControl::default(),
            navigation_info: NavigationInfo::default(),
            warnings: Vec::new(),
            timestamp: now,
        }
    }
}

impl Default for VehicleStatus {
    fn default() -> Self {
        let data = VehicleData::default();
        let now = data.timestamp;
        Self {
            vehicle_data: data,
            media_info: MediaInfo::default(),
            climate_control: ClimateControl::default(),
            navigation_info: NavigationInfo::default(),
            warnings: Vec::new(),
            timestamp: now,
        }
    }
}

/// Warning labels for the given readings
pub fn collect_warnings(
    fuel_level: f64,
    engine_temperature: f64,
    battery_voltage: f64,
) -> Vec<String> {
    let mut warnings = Vec::new();
    if fuel_level < 10.0 {
        warnings.push(WARNING_LOW_FUEL.to_string());
    }
    if engine_temperature > 105.0 {
        warnings.push(WARNING_ENGINE_OVERHEAT.to_string());
    }
    if battery_voltage < 12.0 {
        warnings.push(WARNING_BATTERY_LOW.to_string());
    }
    warnings
}
