//! Vehicle state store
//!
//! Owns the current [`VehicleStatus`] together with the tick bookkeeping in
//! [`RunState`]. Both live behind a single lock so a reader never observes a
//! snapshot from one tick paired with the cursor of another, and writers
//! (ticks and control commands) are serialized with last-write-wins.

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::model::VehicleStatus;
use crate::route::Coordinate;

/// Bookkeeping the tick engine carries between ticks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunState {
    /// Whether the tick loop is active
    pub is_running: bool,
    /// Index of the route segment being traversed
    pub route_cursor: usize,
    /// Trip start, fixed at store creation
    pub trip_start: DateTime<Utc>,
    /// Kilometers covered since `trip_start`
    pub cumulative_distance: f64,
}

impl RunState {
    /// Fresh bookkeeping: stopped, at the start of the route
    pub fn new(trip_start: DateTime<Utc>) -> Self {
        Self {
            is_running: false,
            route_cursor: 0,
            trip_start,
            cumulative_distance: 0.0,
        }
    }
}

#[derive(Debug)]
struct Inner {
    status: VehicleStatus,
    run: RunState,
}

/// Single owner of the current snapshot
#[derive(Debug)]
pub struct VehicleStateStore {
    inner: RwLock<Inner>,
}

impl VehicleStateStore {
    /// Store holding a resting snapshot parked at `origin`
    pub fn new(vehicle_id: &str, origin: Coordinate, now: DateTime<Utc>) -> Self {
        Self::with_status(VehicleStatus::at_rest(vehicle_id, origin, now), RunState::new(now))
    }

    /// Store seeded with an explicit snapshot and bookkeeping
    pub fn with_status(status: VehicleStatus, run: RunState) -> Self {
        Self {
            inner: RwLock::new(Inner { status, run }),
        }
    }

    /// Copy of the latest committed snapshot
    pub async fn snapshot(&self) -> VehicleStatus {
        self.inner.read().await.status.clone()
    }

    /// Copy of the tick bookkeeping
    pub async fn run_state(&self) -> RunState {
        self.inner.read().await.run
    }

    /// Replace the snapshot wholesale
    pub async fn replace(&self, status: VehicleStatus) {
        self.inner.write().await.status = status;
    }

    /// Read-modify-write on the snapshot under the write lock
    pub async fn modify<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut VehicleStatus) -> R,
    {
        let mut guard = self.inner.write().await;
        f(&mut guard.status)
    }

    /// Read-modify-write on the bookkeeping under the write lock
    pub async fn modify_run<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut RunState) -> R,
    {
        let mut guard = self.inner.write().await;
        f(&mut guard.run)
    }

    /// Derive and commit a new snapshot from the current one in a single
    /// critical section. Returns a copy of what was committed.
    pub async fn advance<F>(&self, derive: F) -> VehicleStatus
    where
        F: FnOnce(&VehicleStatus, &mut RunState) -> VehicleStatus,
    {
        let mut guard = self.inner.write().await;
        let Inner { status, run } = &mut *guard;
        let next = derive(status, run);
        *status = next.clone();
        next
    }
}
