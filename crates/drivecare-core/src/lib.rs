//! # DriveCare Core Library
//!
//! Core functionality for the DriveCare connected-car simulator.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Great-circle geometry over a fixed, looping route
//! - The vehicle status snapshot model (engine, media, climate, navigation)
//! - A shared state store that serializes ticks and control commands
//! - The tick engine that derives a new snapshot every interval
//! - Best-effort history recording with simple queries
//!
//! ## Example
//!
//! ```rust,ignore
//! use drivecare_core::{config::SimulatorConfig, history::HistoryStore, sim::Simulator};
//! use std::sync::Arc;
//!
//! let history = Arc::new(HistoryStore::new(10_000));
//! let sim = Simulator::new(SimulatorConfig::default(), history.clone())?;
//!
//! sim.start_simulation().await;
//! sim.set_volume(70).await;
//! let status = sim.current_status().await;
//! println!("speed: {:.1} km/h", status.vehicle_data.speed);
//! sim.stop_simulation().await;
//! ```

pub mod clock;
pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod geo;
pub mod history;
pub mod model;
pub mod route;
pub mod sim;
pub mod store;

pub use error::SimError;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::config::SimulatorConfig;
    pub use crate::history::{HistoryStore, RecordSink, VehicleRecord};
    pub use crate::model::{
        ClimateControl, ClimateMode, Gear, Location, MediaInfo, NavigationInfo, VehicleData,
        VehicleStatus,
    };
    pub use crate::route::{Coordinate, RouteTable};
    pub use crate::sim::Simulator;
    pub use crate::store::VehicleStateStore;
    pub use crate::SimError;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
