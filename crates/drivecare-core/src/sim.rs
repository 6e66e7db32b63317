//! Simulator lifecycle
//!
//! Ties the store, tick engine, history sink and broadcast channel together
//! and owns the periodic tick task. The simulation is either Stopped or
//! Running; `start_simulation` and `stop_simulation` are idempotent.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::SimulatorConfig;
use crate::control::ControlSurface;
use crate::engine::TickEngine;
use crate::history::RecordSink;
use crate::model::{ClimateMode, VehicleStatus};
use crate::store::{RunState, VehicleStateStore};
use crate::SimError;

/// Everything a tick needs, shared with the background task
struct Shared {
    store: Arc<VehicleStateStore>,
    engine: TickEngine,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn RecordSink>,
    updates: broadcast::Sender<Arc<VehicleStatus>>,
    tick_interval: Duration,
}

impl Shared {
    /// Derive, commit, then hand the result to the sink and subscribers.
    async fn tick(&self) -> VehicleStatus {
        let now = self.clock.now();
        let status = self
            .store
            .advance(|prev, run| self.engine.derive(prev, run, now))
            .await;

        debug!(
            speed = status.vehicle_data.speed,
            odometer = status.vehicle_data.odometer,
            fuel = status.vehicle_data.fuel_level,
            "tick committed"
        );

        self.record(&status).await;
        self.publish(status.clone());

        status
    }

    /// Hand the sample to the sink on the blocking pool, waiting at most one
    /// tick interval. A sink that overruns keeps running in the background.
    async fn record(&self, status: &VehicleStatus) {
        let sink = self.sink.clone();
        let data = status.vehicle_data.clone();
        let write = tokio::task::spawn_blocking(move || sink.record(&data));

        match tokio::time::timeout(self.tick_interval, write).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => warn!("Failed to record vehicle data: {e}"),
            Ok(Err(e)) => warn!("Record sink task failed: {e}"),
            Err(_) => warn!(
                timeout_ms = self.tick_interval.as_millis() as u64,
                "Record sink timed out, continuing without waiting"
            ),
        }
    }

    fn publish(&self, status: VehicleStatus) {
        // No subscribers is not an error
        let _ = self.updates.send(Arc::new(status));
    }
}

struct TickTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

async fn run_tick_loop(shared: Arc<Shared>, token: CancellationToken) {
    let mut ticker = tokio::time::interval(shared.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        // Runs to completion even if a stop arrives meanwhile
        shared.tick().await;
    }
    debug!("tick loop exited");
}

/// The vehicle simulator
pub struct Simulator {
    shared: Arc<Shared>,
    controls: ControlSurface,
    task: Mutex<Option<TickTask>>,
}

impl Simulator {
    /// Create a simulator on the system clock
    pub fn new(config: SimulatorConfig, sink: Arc<dyn RecordSink>) -> Result<Self, SimError> {
        Self::with_clock(config, sink, Arc::new(SystemClock))
    }

    /// Create a simulator reading time from `clock`
    pub fn with_clock(
        config: SimulatorConfig,
        sink: Arc<dyn RecordSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SimError> {
        config.validate()?;
        let route = config.route_table()?;
        let store = Arc::new(VehicleStateStore::new(
            &config.vehicle_id,
            route.origin(),
            clock.now(),
        ));
        let engine = TickEngine::new(
            route,
            config.tick_interval(),
            config.destination_label.clone(),
            config.next_turn_label.clone(),
        );
        let (updates, _) = broadcast::channel(config.broadcast_capacity.max(1));

        Ok(Self {
            controls: ControlSurface::new(store.clone()),
            shared: Arc::new(Shared {
                store,
                engine,
                clock,
                sink,
                updates,
                tick_interval: config.tick_interval(),
            }),
            task: Mutex::new(None),
        })
    }

    /// Start ticking. No-op if already running.
    pub async fn start_simulation(&self) {
        let mut task = self.task.lock().await;
        if task.is_some() {
            return;
        }

        self.shared.store.modify_run(|run| run.is_running = true).await;
        let token = CancellationToken::new();
        let handle = tokio::spawn(run_tick_loop(self.shared.clone(), token.clone()));
        *task = Some(TickTask { token, handle });

        info!(
            interval_ms = self.shared.tick_interval.as_millis() as u64,
            "Simulation started"
        );
    }

    /// Stop ticking. Waits for an in-flight tick to commit; no tick starts
    /// after this returns. No-op if already stopped.
    ///
    /// The wait is bounded: a tick gives the record sink at most one tick
    /// interval before moving on.
    pub async fn stop_simulation(&self) {
        let mut task = self.task.lock().await;
        let Some(TickTask { token, handle }) = task.take() else {
            return;
        };

        token.cancel();
        if let Err(e) = handle.await {
            warn!("Tick task ended abnormally: {e}");
        }
        self.shared.store.modify_run(|run| run.is_running = false).await;

        info!("Simulation stopped");
    }

    /// Whether the tick loop is active
    pub async fn is_running(&self) -> bool {
        self.shared.store.run_state().await.is_running
    }

    /// Latest committed snapshot
    pub async fn current_status(&self) -> VehicleStatus {
        self.shared.store.snapshot().await
    }

    /// Tick bookkeeping (route cursor, trip distance)
    pub async fn run_state(&self) -> RunState {
        self.shared.store.run_state().await
    }

    /// Run one tick immediately while stopped.
    ///
    /// While the periodic loop is running this does nothing and returns the
    /// latest committed snapshot, so ticks stay strictly sequential.
    pub async fn tick_once(&self) -> VehicleStatus {
        // Held across the tick so a concurrent start waits for it
        let task = self.task.lock().await;
        if task.is_some() {
            debug!("manual tick ignored while running");
            return self.shared.store.snapshot().await;
        }
        self.shared.tick().await
    }

    /// Broadcast the current snapshot on demand
    pub async fn publish_current(&self) {
        let status = self.shared.store.snapshot().await;
        self.shared.publish(status);
    }

    /// Receive every published snapshot from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<VehicleStatus>> {
        self.shared.updates.subscribe()
    }

    /// Media and climate commands
    pub fn controls(&self) -> &ControlSurface {
        &self.controls
    }

    /// Flip media playback
    pub async fn toggle_play_pause(&self) -> bool {
        self.controls.toggle_play_pause().await
    }

    /// Set media volume, clamped to 0-100
    pub async fn set_volume(&self, volume: i32) -> i32 {
        self.controls.set_volume(volume).await
    }

    /// Set the climate set point, clamped to 16-30 °C
    pub async fn set_climate_temperature(&self, temperature: f64) -> f64 {
        self.controls.set_climate_temperature(temperature).await
    }

    /// Set the climate fan speed, clamped to 1-5
    pub async fn set_climate_fan_speed(&self, fan_speed: i32) -> i32 {
        self.controls.set_climate_fan_speed(fan_speed).await
    }

    /// Cycle the climate mode
    pub async fn toggle_climate_mode(&self) -> ClimateMode {
        self.controls.toggle_climate_mode().await
    }

    /// Switch the climate system on or off
    pub async fn set_climate_enabled(&self, enabled: bool) {
        self.controls.set_climate_enabled(enabled).await
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.token.cancel();
        }
    }
}
