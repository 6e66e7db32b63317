use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Duration as ChronoDuration;
use drivecare_core::clock::ManualClock;
use drivecare_core::config::SimulatorConfig;
use drivecare_core::geo::{distance_meters, interpolate};
use drivecare_core::history::{HistoryStore, RecordSink};
use drivecare_core::model::{VehicleData, WARNING_LOW_FUEL};
use drivecare_core::route::{Coordinate, RouteTable};
use drivecare_core::sim::Simulator;
use drivecare_core::SimError;
use pretty_assertions::assert_eq;

// 2001-09-09T01:46:40Z, a multiple of the 10 s segment period
const EPOCH_MS: i64 = 1_000_000_000_000;

fn simulator(config: SimulatorConfig) -> (Simulator, Arc<HistoryStore>, ManualClock) {
    let history = Arc::new(HistoryStore::new(config.history_capacity));
    let clock = ManualClock::from_millis(EPOCH_MS);
    let sim = Simulator::with_clock(config, history.clone(), Arc::new(clock.clone())).unwrap();
    (sim, history, clock)
}

struct FailingSink {
    calls: AtomicUsize,
}

impl RecordSink for FailingSink {
    fn record(&self, _data: &VehicleData) -> Result<(), SimError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SimError::HistoryUnavailable("database offline".into()))
    }
}

/// Blocks every call until the test drops the sender
struct StalledSink {
    gate: Mutex<mpsc::Receiver<()>>,
    calls: AtomicUsize,
}

impl RecordSink for StalledSink {
    fn record(&self, _data: &VehicleData) -> Result<(), SimError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.gate.lock().unwrap().recv();
        Ok(())
    }
}

#[tokio::test]
async fn test_initial_status_is_at_rest() {
    let (sim, history, _) = simulator(SimulatorConfig::default());
    let status = sim.current_status().await;

    assert!(!sim.is_running().await);
    assert!(!status.vehicle_data.is_engine_running);
    assert_eq!(status.vehicle_data.fuel_level, 100.0);
    assert_eq!(
        status.vehicle_data.location.coordinate(),
        RouteTable::default().origin()
    );
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_first_tick_moves_along_first_segment() {
    let (sim, _, clock) = simulator(SimulatorConfig::default());
    clock.advance(ChronoDuration::milliseconds(3_000));

    let route = RouteTable::default();
    let status = sim.tick_once().await;
    let expected = interpolate(route.waypoints()[0], route.waypoints()[1], 0.3);

    assert_eq!(status.vehicle_data.location.coordinate(), expected);
    let moved = distance_meters(route.origin(), expected);
    assert!((status.vehicle_data.speed - moved * 3600.0).abs() < 1e-6);
    assert_eq!(sim.current_status().await, status);
}

#[tokio::test]
async fn test_odometer_and_trip_never_decrease() {
    let (sim, history, clock) = simulator(SimulatorConfig::default());

    let mut last_odometer = 0.0;
    let mut last_trip = 0.0;
    for _ in 0..200 {
        clock.advance(ChronoDuration::milliseconds(1_000));
        let data = sim.tick_once().await.vehicle_data;
        assert!(data.odometer >= last_odometer);
        assert!(data.trip_distance >= last_trip);
        last_odometer = data.odometer;
        last_trip = data.trip_distance;
    }

    assert!(last_odometer > 0.0);
    assert_eq!(history.len(), 200);
    assert_eq!(sim.run_state().await.cumulative_distance, last_trip);
}

#[tokio::test]
async fn test_route_loops_past_final_segment() {
    let route = vec![
        Coordinate::new(37.50, 127.00),
        Coordinate::new(37.51, 127.01),
        Coordinate::new(37.52, 127.02),
    ];
    let config = SimulatorConfig {
        route: Some(route.clone()),
        ..SimulatorConfig::default()
    };
    let (sim, _, clock) = simulator(config);

    // Land at 99.5 % of each sweep so every tick advances the cursor
    clock.advance(ChronoDuration::milliseconds(9_950));
    let mut cursors = Vec::new();
    for _ in 0..4 {
        sim.tick_once().await;
        cursors.push(sim.run_state().await.route_cursor);
        clock.advance(ChronoDuration::milliseconds(10_000));
    }
    assert_eq!(cursors, vec![1, 0, 1, 0]);

    // Having consumed the final segment, the next fix is back on segment 0
    clock.advance(ChronoDuration::milliseconds(-4_950));
    let status = sim.tick_once().await;
    let expected = interpolate(route[0], route[1], 0.5);
    assert_eq!(status.vehicle_data.location.coordinate(), expected);
}

#[tokio::test]
async fn test_parked_engine_cools_to_ambient() {
    let spot = Coordinate::new(37.5665, 126.9780);
    let config = SimulatorConfig {
        route: Some(vec![spot, spot]),
        ..SimulatorConfig::default()
    };
    let (sim, _, clock) = simulator(config);

    let mut last = sim.current_status().await.vehicle_data.engine_temperature;
    for _ in 0..200 {
        clock.advance(ChronoDuration::milliseconds(1_000));
        let data = sim.tick_once().await.vehicle_data;
        assert_eq!(data.speed, 0.0);
        assert!(data.engine_temperature >= 20.0);
        if last > 20.0 {
            assert!(data.engine_temperature < last);
        } else {
            assert_eq!(data.engine_temperature, 20.0);
        }
        last = data.engine_temperature;
    }
    assert_eq!(last, 20.0);
}

#[tokio::test]
async fn test_bounds_hold_under_mixed_commands() {
    let (sim, _, clock) = simulator(SimulatorConfig::default());
    let volumes = [150, -10, 42, i32::MAX, i32::MIN];
    let temperatures = [40.0, 0.0, 22.5, f64::INFINITY, f64::NEG_INFINITY];
    let fans = [0, 9, 3, -1, 6];

    for i in 0..50 {
        sim.set_volume(volumes[i % volumes.len()]).await;
        sim.set_climate_temperature(temperatures[i % temperatures.len()])
            .await;
        sim.set_climate_fan_speed(fans[i % fans.len()]).await;
        if i % 7 == 0 {
            sim.toggle_play_pause().await;
        }
        clock.advance(ChronoDuration::milliseconds(1_000));
        let status = sim.tick_once().await;

        let data = &status.vehicle_data;
        assert!((0.0..=100.0).contains(&data.fuel_level));
        assert!((0..=100).contains(&status.media_info.volume));
        assert!((16.0..=30.0).contains(&status.climate_control.temperature));
        assert!((1..=5).contains(&status.climate_control.fan_speed));
        assert!(status.media_info.current_time < status.media_info.duration);
    }
}

#[tokio::test]
async fn test_failing_sink_does_not_stop_ticks() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let sink = Arc::new(FailingSink {
        calls: AtomicUsize::new(0),
    });
    let clock = ManualClock::from_millis(EPOCH_MS + 5_000);
    let sim = Simulator::with_clock(SimulatorConfig::default(), sink.clone(), Arc::new(clock))
        .unwrap();

    let first = sim.tick_once().await;
    let second = sim.tick_once().await;
    assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
    assert_eq!(sim.current_status().await, second);
    assert!(first.vehicle_data.speed > 0.0);
}

#[tokio::test]
async fn test_subscribers_receive_ticks_and_on_demand_publishes() {
    let (sim, _, clock) = simulator(SimulatorConfig::default());
    let mut rx = sim.subscribe();

    clock.advance(ChronoDuration::milliseconds(1_000));
    let ticked = sim.tick_once().await;
    let received = rx.recv().await.unwrap();
    assert_eq!(*received, ticked);

    sim.set_volume(7).await;
    sim.publish_current().await;
    let received = rx.recv().await.unwrap();
    assert_eq!(received.media_info.volume, 7);
}

#[tokio::test]
async fn test_low_fuel_warning_after_long_drive() {
    let (sim, _, clock) = simulator(SimulatorConfig::default());

    let mut warned = false;
    // Fuel burns at >= 8.5 %/h while moving, so this takes a simulated while
    for _ in 0..40_000 {
        clock.advance(ChronoDuration::milliseconds(1_000));
        let status = sim.tick_once().await;
        if status.warnings.iter().any(|w| w == WARNING_LOW_FUEL) {
            assert!(status.vehicle_data.fuel_level < 10.0);
            warned = true;
            break;
        }
    }
    assert!(warned);
}

#[tokio::test(start_paused = true)]
async fn test_periodic_ticks_follow_interval() {
    let (sim, history, _) = simulator(SimulatorConfig::default());

    sim.start_simulation().await;
    assert!(sim.is_running().await);
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    sim.stop_simulation().await;

    assert!(!sim.is_running().await);
    assert_eq!(history.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_double_start_is_noop() {
    let (sim, history, _) = simulator(SimulatorConfig::default());

    sim.start_simulation().await;
    sim.start_simulation().await;
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    sim.stop_simulation().await;
    sim.stop_simulation().await;

    assert_eq!(history.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_stop_freezes_snapshot() {
    let (sim, history, clock) = simulator(SimulatorConfig::default());

    sim.start_simulation().await;
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    sim.stop_simulation().await;

    let frozen = sim.current_status().await;
    let recorded = history.len();

    clock.advance(ChronoDuration::milliseconds(5_000));
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(sim.current_status().await, frozen);
    assert_eq!(history.len(), recorded);
}

#[tokio::test(start_paused = true)]
async fn test_restart_resumes_trip() {
    let (sim, history, clock) = simulator(SimulatorConfig::default());
    clock.advance(ChronoDuration::milliseconds(2_000));

    sim.start_simulation().await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    sim.stop_simulation().await;
    let trip = sim.current_status().await.vehicle_data.trip_distance;
    assert!(trip > 0.0);

    clock.advance(ChronoDuration::milliseconds(2_000));
    sim.start_simulation().await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    sim.stop_simulation().await;

    assert_eq!(history.len(), 2);
    assert!(sim.current_status().await.vehicle_data.trip_distance > trip);
}

#[tokio::test(start_paused = true)]
async fn test_manual_tick_ignored_while_running() {
    let (sim, history, clock) = simulator(SimulatorConfig::default());
    clock.advance(ChronoDuration::milliseconds(2_000));

    sim.start_simulation().await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(history.len(), 1);

    clock.advance(ChronoDuration::milliseconds(1_000));
    let returned = sim.tick_once().await;
    assert_eq!(returned, sim.current_status().await);
    assert_eq!(history.len(), 1);

    sim.stop_simulation().await;
    assert_eq!(history.len(), 1);

    // Once stopped, a manual tick runs again
    let ticked = sim.tick_once().await;
    assert_ne!(ticked, returned);
    assert_eq!(history.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stalled_sink_does_not_block_stop() {
    let (release, gate) = mpsc::channel();
    let sink = Arc::new(StalledSink {
        gate: Mutex::new(gate),
        calls: AtomicUsize::new(0),
    });
    let config = SimulatorConfig {
        tick_interval_ms: 50,
        ..SimulatorConfig::default()
    };
    let sim = Simulator::new(config, sink.clone()).unwrap();

    let started = Instant::now();
    let status = sim.tick_once().await;
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(sim.current_status().await, status);

    sim.start_simulation().await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    let stopped = tokio::time::timeout(Duration::from_secs(2), sim.stop_simulation()).await;
    assert!(stopped.is_ok());
    assert!(!sim.is_running().await);
    assert!(sink.calls.load(Ordering::SeqCst) >= 2);

    drop(release);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_controls_race_with_ticks() {
    let config = SimulatorConfig {
        tick_interval_ms: 5,
        ..SimulatorConfig::default()
    };
    let sim = Arc::new(Simulator::new(config, Arc::new(HistoryStore::new(1_000))).unwrap());
    sim.start_simulation().await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let sim = sim.clone();
        handles.push(tokio::spawn(async move {
            for j in 0..50 {
                sim.set_volume(i * 40 - j).await;
                sim.toggle_climate_mode().await;
                let status = sim.current_status().await;
                assert!((0..=100).contains(&status.media_info.volume));
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    sim.stop_simulation().await;
    // 400 toggles: 133 full cycles plus one step from Auto
    let mode = sim.current_status().await.climate_control.mode;
    assert_eq!(mode, drivecare_core::model::ClimateMode::Manual);
}
