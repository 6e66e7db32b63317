//! DriveCare headless host
//!
//! Runs the simulator until Ctrl-C, logging each published snapshot, then
//! exports the recorded history as CSV into the app data directory.
//!
//! Usage: `drivecare [config.json]` (or set `DRIVECARE_CONFIG`).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use drivecare_core::config::SimulatorConfig;
use drivecare_core::history::{write_csv, HistoryStore};
use drivecare_core::model::VehicleStatus;
use drivecare_core::sim::Simulator;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable naming the config file
const CONFIG_ENV: &str = "DRIVECARE_CONFIG";

/// Get the DriveCare app data directory (cross-platform)
fn get_app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("DriveCare")
}

/// First CLI argument wins over the environment variable
fn resolve_config_path<I>(mut args: I, env_value: Option<String>) -> Option<PathBuf>
where
    I: Iterator<Item = String>,
{
    args.next()
        .or(env_value)
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SimulatorConfig> {
    match path {
        Some(path) => SimulatorConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(SimulatorConfig::default()),
    }
}

fn history_export_path(dir: &Path, at: DateTime<Utc>) -> PathBuf {
    dir.join(format!("history-{}.csv", at.format("%Y%m%d-%H%M%S")))
}

fn summarize(status: &VehicleStatus) -> String {
    let data = &status.vehicle_data;
    format!(
        "{:>8.1} km/h  {:>4} rpm  fuel {:>5.1}%  {:>5.1}°C  {:.2} V  odo {:.3} km",
        data.speed,
        data.rpm,
        data.fuel_level,
        data.engine_temperature,
        data.battery_voltage,
        data.odometer
    )
}

async fn log_updates(mut rx: broadcast::Receiver<Arc<VehicleStatus>>) {
    loop {
        match rx.recv().await {
            Ok(status) => {
                info!(
                    gear = status.vehicle_data.gear_position.as_str(),
                    "{}",
                    summarize(&status)
                );
                for warning in &status.warnings {
                    warn!("Vehicle warning: {warning}");
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Status logger lagged, skipped {skipped} updates")
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path =
        resolve_config_path(std::env::args().skip(1), std::env::var(CONFIG_ENV).ok());
    let config = load_config(config_path.as_deref())?;
    info!(
        vehicle = %config.vehicle_id,
        interval_ms = config.tick_interval_ms,
        "DriveCare simulator starting"
    );

    let started_at = Utc::now();
    let history = Arc::new(HistoryStore::new(config.history_capacity));
    let sim = Simulator::new(config.clone(), history.clone())?;
    let logger = tokio::spawn(log_updates(sim.subscribe()));

    sim.start_simulation().await;
    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    sim.stop_simulation().await;

    let final_status = sim.current_status().await;
    info!("Final status: {}", serde_json::to_string(&final_status)?);

    let stats = history.statistics(&config.vehicle_id, started_at)?;
    info!(
        average_speed = stats.average_speed,
        total_distance = stats.total_distance,
        "Trip statistics"
    );

    let dir = get_app_data_dir();
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let export = history_export_path(&dir, Utc::now());
    write_csv(&export, &history.records()?)?;
    info!("Exported {} records to {}", history.len(), export.display());

    // Dropping the simulator closes the broadcast channel and ends the logger
    drop(sim);
    if let Err(e) = logger.await {
        warn!("Status logger ended abnormally: {e}");
    }

    Ok(())
}
