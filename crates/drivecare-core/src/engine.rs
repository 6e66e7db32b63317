//! Tick engine
//!
//! Derives the next [`VehicleStatus`] from the previous one, the route and the
//! wall-clock time of the tick. Derivation is a pure function of its inputs
//! apart from the [`RunState`] it advances, so it can be driven by the
//! periodic task in [`crate::sim`] or stepped directly in tests.
//!
//! Position does not depend on tick count: progress along the current segment
//! is `(epoch_ms mod 10 000) / 10 000`, a sawtooth that sweeps each segment
//! once every ten seconds of wall time.

use std::f64::consts::PI;
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use tracing::trace;

use crate::geo::{bearing_degrees, distance_meters, interpolate, meters_to_km};
use crate::model::{
    collect_warnings, ClimateControl, Gear, Location, NavigationInfo, VehicleData, VehicleStatus,
    FUEL_LEVEL_RANGE,
};
use crate::route::{Coordinate, RouteTable};
use crate::store::RunState;

/// Length of one sweep across a segment
pub const SEGMENT_PERIOD_MS: i64 = 10_000;

/// Progress at which the cursor moves to the next segment
pub const SEGMENT_ADVANCE_THRESHOLD: f64 = 0.99;

/// Average speed assumed for arrival estimates, km/h
pub const ETA_ASSUMED_SPEED_KMH: f64 = 30.0;

/// GPS accuracy reported on every fix, meters
pub const GPS_ACCURACY_M: f64 = 5.0;

/// Distance reported to the next maneuver, km
pub const NEXT_TURN_DISTANCE_KM: f64 = 0.5;

/// Static labels and timing for derivation
#[derive(Debug, Clone)]
pub struct TickEngine {
    route: RouteTable,
    tick_seconds: f64,
    destination_label: String,
    next_turn_label: String,
}

impl TickEngine {
    /// Create an engine for `route` stepping every `tick_interval`
    pub fn new(
        route: RouteTable,
        tick_interval: Duration,
        destination_label: impl Into<String>,
        next_turn_label: impl Into<String>,
    ) -> Self {
        Self {
            route,
            tick_seconds: tick_interval.as_secs_f64(),
            destination_label: destination_label.into(),
            next_turn_label: next_turn_label.into(),
        }
    }

    /// The route being driven
    pub fn route(&self) -> &RouteTable {
        &self.route
    }

    /// Compute the snapshot for a tick at `now`, advancing `run`.
    pub fn derive(
        &self,
        prev: &VehicleStatus,
        run: &mut RunState,
        now: DateTime<Utc>,
    ) -> VehicleStatus {
        let prev_data = &prev.vehicle_data;

        let location = self.advance_position(run, now);
        let speed = self.speed_kmh(prev_data.location.coordinate(), location.coordinate());
        let moving = speed > 0.0;

        // Once started the engine stays on; nothing in a tick turns it off
        let is_engine_running = moving || prev_data.is_engine_running;

        let fuel_consumption = fuel_rate(speed);
        let fuel_level = (prev_data.fuel_level - fuel_consumption / 3600.0 * self.tick_seconds)
            .clamp(FUEL_LEVEL_RANGE.0, FUEL_LEVEL_RANGE.1);

        let distance_increment = if moving {
            speed / 3600.0 * self.tick_seconds
        } else {
            0.0
        };
        run.cumulative_distance += distance_increment;

        let average_speed = average_speed(run.cumulative_distance, run.trip_start, now);
        let engine_temperature =
            engine_temperature(prev_data.engine_temperature, is_engine_running, speed);
        let battery_voltage = battery_voltage(is_engine_running, now.second());

        let mut media_info = prev.media_info.clone();
        media_info.advance();

        let climate_control = self.climate(&prev.climate_control, now);
        let navigation_info = self.navigation(location.coordinate());
        let warnings = collect_warnings(fuel_level, engine_temperature, battery_voltage);

        VehicleStatus {
            vehicle_data: VehicleData {
                id: prev_data.id.clone(),
                speed,
                rpm: rpm_for_speed(speed),
                fuel_level,
                engine_temperature,
                battery_voltage,
                location,
                timestamp: now,
                is_engine_running,
                gear_position: if moving { Gear::Drive } else { Gear::Park },
                odometer: prev_data.odometer + distance_increment,
                trip_distance: run.cumulative_distance,
                average_speed,
                fuel_consumption,
            },
            media_info,
            climate_control,
            navigation_info,
            warnings,
            timestamp: now,
        }
    }

    /// Interpolate along the current segment and move the cursor on when the
    /// sweep is nearly complete.
    fn advance_position(&self, run: &mut RunState, now: DateTime<Utc>) -> Location {
        let segment = self.route.segment_at(run.route_cursor);
        run.route_cursor = segment.index;

        let progress = segment_progress(now);
        let position = interpolate(segment.start, segment.end, progress);
        let heading = bearing_degrees(segment.start, segment.end);

        if progress >= SEGMENT_ADVANCE_THRESHOLD {
            run.route_cursor = self.route.next_index(segment.index);
        }

        Location {
            latitude: position.latitude,
            longitude: position.longitude,
            altitude: 0.0,
            heading,
            accuracy: GPS_ACCURACY_M,
        }
    }

    /// Distance covered this tick, scaled by 3600 into the reported km/h figure.
    fn speed_kmh(&self, from: Coordinate, to: Coordinate) -> f64 {
        distance_meters(from, to) / self.tick_seconds * 3600.0
    }

    fn climate(&self, current: &ClimateControl, now: DateTime<Utc>) -> ClimateControl {
        // Outside temperature is modeled but does not drive the set point yet
        let outside = outside_temperature(now);
        trace!(outside_temperature = outside, "climate passthrough");
        current.clone()
    }

    fn navigation(&self, position: Coordinate) -> NavigationInfo {
        let remaining_km = meters_to_km(distance_meters(position, self.route.destination()));
        NavigationInfo {
            is_active: true,
            destination: self.destination_label.clone(),
            estimated_time: eta_minutes(remaining_km),
            remaining_distance: remaining_km,
            current_route: self.route.waypoints().to_vec(),
            next_turn: self.next_turn_label.clone(),
            next_turn_distance: NEXT_TURN_DISTANCE_KM,
        }
    }
}

/// Fraction of the current segment covered at `now`, in [0, 1)
pub fn segment_progress(now: DateTime<Utc>) -> f64 {
    now.timestamp_millis().rem_euclid(SEGMENT_PERIOD_MS) as f64 / SEGMENT_PERIOD_MS as f64
}

/// Engine RPM for a given speed
pub fn rpm_for_speed(speed: f64) -> u32 {
    match speed {
        s if s == 0.0 => 800,
        s if s < 20.0 => 1500,
        s if s < 40.0 => 2000,
        s if s < 60.0 => 2500,
        s if s < 80.0 => 3000,
        _ => 3500,
    }
}

/// Instantaneous fuel consumption rate
pub fn fuel_rate(speed: f64) -> f64 {
    if speed > 0.0 {
        8.5 + speed * 0.1
    } else {
        0.5
    }
}

/// Coolant temperature: tracks load while running, cools 0.5 °C per tick
/// toward ambient (20 °C) otherwise.
pub fn engine_temperature(previous: f64, running: bool, speed: f64) -> f64 {
    if running {
        (90.0 + speed * 0.2).min(110.0)
    } else {
        (previous - 0.5).max(20.0)
    }
}

/// Battery voltage for the given second of the minute
pub fn battery_voltage(running: bool, second_of_minute: u32) -> f64 {
    let second = f64::from(second_of_minute);
    if running {
        14.2 + (second * PI / 30.0).sin() * 0.1
    } else {
        12.6 - second * 0.001
    }
}

/// Trip average speed in km/h; 0 before the first whole second has elapsed
pub fn average_speed(distance_km: f64, trip_start: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let hours = (now - trip_start).num_seconds() as f64 / 3600.0;
    if hours > 0.0 {
        distance_km / hours
    } else {
        0.0
    }
}

/// Whole minutes to cover `remaining_km` at the assumed average speed
pub fn eta_minutes(remaining_km: f64) -> u32 {
    (remaining_km * 60.0 / ETA_ASSUMED_SPEED_KMH) as u32
}

/// Simulated outside air temperature
pub fn outside_temperature(now: DateTime<Utc>) -> f64 {
    25.0 + (now.timestamp_millis() as f64 / 10_000.0).sin() * 5.0
}
