//! History recording
//!
//! The tick engine hands every [`VehicleData`] sample to a [`RecordSink`].
//! [`HistoryStore`] is the bundled sink: a bounded in-memory buffer that also
//! answers the usual dashboard queries (recent samples, time ranges, trip
//! aggregates) and can be exported to CSV.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Gear, VehicleData};
use crate::SimError;

/// Destination for per-tick samples.
///
/// Called once per tick on the blocking thread pool, so implementations may
/// do synchronous I/O. A call that runs longer than one tick interval is
/// abandoned by the tick (it finishes in the background) and later samples
/// may then arrive out of order. Errors are logged and never stop the loop.
pub trait RecordSink: Send + Sync {
    /// Persist one sample
    fn record(&self, data: &VehicleData) -> Result<(), SimError>;
}

/// A persisted sample, flattened for storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRecord {
    /// Record id
    pub id: Uuid,
    /// Vehicle the sample belongs to
    pub vehicle_id: String,
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
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Altitude in meters
    pub altitude: f64,
    /// Heading in degrees
    pub heading: f64,
    /// GPS accuracy in meters
    pub accuracy: f64,
    /// Engine running flag
    pub is_engine_running: bool,
    /// Transmission position
    pub gear_position: Gear,
    /// Odometer in km
    pub odometer: f64,
    /// Trip distance in km
    pub trip_distance: f64,
    /// Average trip speed in km/h
    pub average_speed: f64,
    /// Fuel consumption rate
    pub fuel_consumption: f64,
    /// Sample time
    pub timestamp: DateTime<Utc>,
    /// When the record was stored
    pub created_at: DateTime<Utc>,
}

impl VehicleRecord {
    /// Flatten a sample into a new record
    pub fn from_data(data: &VehicleData) -> Self {
        Self {
            id: Uuid::new_v4(),
            vehicle_id: data.id.clone(),
            speed: data.speed,
            rpm: data.rpm,
            fuel_level: data.fuel_level,
            engine_temperature: data.engine_temperature,
            battery_voltage: data.battery_voltage,
            latitude: data.location.latitude,
            longitude: data.location.longitude,
            altitude: data.location.altitude,
            heading: data.location.heading,
            accuracy: data.location.accuracy,
            is_engine_running: data.is_engine_running,
            gear_position: data.gear_position,
            odometer: data.odometer,
            trip_distance: data.trip_distance,
            average_speed: data.average_speed,
            fuel_consumption: data.fuel_consumption,
            timestamp: data.timestamp,
            created_at: Utc::now(),
        }
    }
}

/// Aggregates over a vehicle's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripStatistics {
    /// Vehicle queried
    pub vehicle_id: String,
    /// Lower time bound of the query
    pub start_time: DateTime<Utc>,
    /// Mean of recorded speeds, 0 when nothing matched
    pub average_speed: f64,
    /// Sum of recorded trip distances, 0 when nothing matched
    pub total_distance: f64,
}

/// Bounded in-memory history
pub struct HistoryStore {
    records: Mutex<VecDeque<VehicleRecord>>,
    capacity: usize,
}

impl HistoryStore {
    /// Create a store holding at most `capacity` records; the oldest are
    /// dropped first.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, VecDeque<VehicleRecord>>, SimError> {
        self.records
            .lock()
            .map_err(|e| SimError::HistoryUnavailable(e.to_string()))
    }

    /// Store a record, evicting the oldest when full
    pub fn push(&self, record: VehicleRecord) -> Result<(), SimError> {
        let mut records = self.lock()?;
        if records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
        Ok(())
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most recent `limit` records for a vehicle, newest first
    pub fn recent(&self, vehicle_id: &str, limit: usize) -> Result<Vec<VehicleRecord>, SimError> {
        let mut matching: Vec<VehicleRecord> = self
            .lock()?
            .iter()
            .filter(|r| r.vehicle_id == vehicle_id)
            .cloned()
            .collect();
        sort_newest_first(&mut matching);
        matching.truncate(limit);
        Ok(matching)
    }

    /// Records with `start <= timestamp <= end`, newest first
    pub fn between(
        &self,
        vehicle_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<VehicleRecord>, SimError> {
        let mut matching: Vec<VehicleRecord> = self
            .lock()?
            .iter()
            .filter(|r| r.vehicle_id == vehicle_id && r.timestamp >= start && r.timestamp <= end)
            .cloned()
            .collect();
        sort_newest_first(&mut matching);
        Ok(matching)
    }

    /// Mean speed of records at or after `since`; `None` when nothing matched
    pub fn average_speed(
        &self,
        vehicle_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<f64>, SimError> {
        let records = self.lock()?;
        let speeds: Vec<f64> = records
            .iter()
            .filter(|r| r.vehicle_id == vehicle_id && r.timestamp >= since)
            .map(|r| r.speed)
            .collect();
        if speeds.is_empty() {
            return Ok(None);
        }
        Ok(Some(speeds.iter().sum::<f64>() / speeds.len() as f64))
    }

    /// Sum of trip distances of records at or after `since`; `None` when
    /// nothing matched.
    ///
    /// Each record carries the running trip total, so this sums cumulative
    /// values rather than per-tick increments.
    pub fn total_distance(
        &self,
        vehicle_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<f64>, SimError> {
        let records = self.lock()?;
        let mut matched = false;
        let mut total = 0.0;
        for r in records
            .iter()
            .filter(|r| r.vehicle_id == vehicle_id && r.timestamp >= since)
        {
            matched = true;
            total += r.trip_distance;
        }
        Ok(matched.then_some(total))
    }

    /// Average speed and total distance in one call, zero-filled
    pub fn statistics(
        &self,
        vehicle_id: &str,
        since: DateTime<Utc>,
    ) -> Result<TripStatistics, SimError> {
        Ok(TripStatistics {
            vehicle_id: vehicle_id.to_string(),
            start_time: since,
            average_speed: self.average_speed(vehicle_id, since)?.unwrap_or(0.0),
            total_distance: self.total_distance(vehicle_id, since)?.unwrap_or(0.0),
        })
    }

    /// Copy of every stored record, oldest first
    pub fn records(&self) -> Result<Vec<VehicleRecord>, SimError> {
        Ok(self.lock()?.iter().cloned().collect())
    }

    /// Drop all records
    pub fn clear(&self) -> Result<(), SimError> {
        self.lock()?.clear();
        Ok(())
    }
}

impl RecordSink for HistoryStore {
    fn record(&self, data: &VehicleData) -> Result<(), SimError> {
        self.push(VehicleRecord::from_data(data))
    }
}

fn sort_newest_first(records: &mut [VehicleRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Write records to a CSV file
pub fn write_csv<P: AsRef<Path>>(path: P, records: &[VehicleRecord]) -> Result<(), SimError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(
        writer,
        "timestamp,vehicleId,speed,rpm,fuelLevel,engineTemperature,batteryVoltage,\
         latitude,longitude,heading,engineRunning,gear,odometer,tripDistance,\
         averageSpeed,fuelConsumption"
    )?;

    for r in records {
        writeln!(
            writer,
            "{},{},{:.3},{},{:.4},{:.2},{:.3},{:.6},{:.6},{:.2},{},{},{:.4},{:.4},{:.3},{:.3}",
            r.timestamp.to_rfc3339(),
            r.vehicle_id,
            r.speed,
            r.rpm,
            r.fuel_level,
            r.engine_temperature,
            r.battery_voltage,
            r.latitude,
            r.longitude,
            r.heading,
            r.is_engine_running,
            r.gear_position.as_str(),
            r.odometer,
            r.trip_distance,
            r.average_speed,
            r.fuel_consumption,
        )?;
    }

    writer.flush()?;
    Ok(())
}
