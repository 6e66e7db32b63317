//! Control surface
//!
//! Commands from the dashboard (media, climate) applied directly to the
//! shared snapshot, independent of tick timing. Every command is total:
//! out-of-range input is clamped, never rejected.

use std::sync::Arc;

use tracing::debug;

use crate::model::{ClimateMode, CLIMATE_TEMPERATURE_RANGE, FAN_SPEED_RANGE, VOLUME_RANGE};
use crate::store::VehicleStateStore;

/// Clamp a requested volume into 0-100
pub fn clamp_volume(volume: i32) -> i32 {
    volume.clamp(VOLUME_RANGE.0, VOLUME_RANGE.1)
}

/// Clamp a requested set point into 16-30 °C; NaN falls to the lower bound
pub fn clamp_climate_temperature(temperature: f64) -> f64 {
    if temperature.is_nan() {
        return CLIMATE_TEMPERATURE_RANGE.0;
    }
    temperature.clamp(CLIMATE_TEMPERATURE_RANGE.0, CLIMATE_TEMPERATURE_RANGE.1)
}

/// Clamp a requested fan speed into 1-5
pub fn clamp_fan_speed(fan_speed: i32) -> i32 {
    fan_speed.clamp(FAN_SPEED_RANGE.0, FAN_SPEED_RANGE.1)
}

/// Mutating commands on the shared snapshot
#[derive(Debug, Clone)]
pub struct ControlSurface {
    store: Arc<VehicleStateStore>,
}

impl ControlSurface {
    /// Create a control surface over `store`
    pub fn new(store: Arc<VehicleStateStore>) -> Self {
        Self { store }
    }

    /// Flip media playback; returns the new playing state
    pub async fn toggle_play_pause(&self) -> bool {
        let playing = self
            .store
            .modify(|s| {
                s.media_info.is_playing = !s.media_info.is_playing;
                s.media_info.is_playing
            })
            .await;
        debug!(playing, "media toggled");
        playing
    }

    /// Set media volume; returns the stored (clamped) value
    pub async fn set_volume(&self, volume: i32) -> i32 {
        let volume = clamp_volume(volume);
        self.store.modify(|s| s.media_info.volume = volume).await;
        debug!(volume, "volume set");
        volume
    }

    /// Set the climate set point; returns the stored (clamped) value
    pub async fn set_climate_temperature(&self, temperature: f64) -> f64 {
        let temperature = clamp_climate_temperature(temperature);
        self.store
            .modify(|s| s.climate_control.temperature = temperature)
            .await;
        debug!(temperature, "climate temperature set");
        temperature
    }

    /// Set the climate fan speed; returns the stored (clamped) value
    pub async fn set_climate_fan_speed(&self, fan_speed: i32) -> i32 {
        let fan_speed = clamp_fan_speed(fan_speed);
        self.store
            .modify(|s| s.climate_control.fan_speed = fan_speed)
            .await;
        debug!(fan_speed, "fan speed set");
        fan_speed
    }

    /// Cycle Auto → Manual → Defrost → Auto; returns the new mode
    pub async fn toggle_climate_mode(&self) -> ClimateMode {
        let mode = self
            .store
            .modify(|s| {
                s.climate_control.mode = s.climate_control.mode.next();
                s.climate_control.mode
            })
            .await;
        debug!(?mode, "climate mode toggled");
        mode
    }

    /// Switch the climate system on or off
    pub async fn set_climate_enabled(&self, enabled: bool) {
        self.store
            .modify(|s| s.climate_control.is_enabled = enabled)
            .await;
        debug!(enabled, "climate power set");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Coordinate;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn controls() -> (ControlSurface, Arc<VehicleStateStore>) {
        let store = Arc::new(VehicleStateStore::new(
            "v",
            Coordinate::new(0.0, 0.0),
            Utc::now(),
        ));
        (ControlSurface::new(store.clone()), store)
    }

    #[test]
    fn test_clamps() {
        assert_eq!(clamp_volume(150), 100);
        assert_eq!(clamp_volume(-10), 0);
        assert_eq!(clamp_volume(35), 35);
        assert_eq!(clamp_climate_temperature(40.0), 30.0);
        assert_eq!(clamp_climate_temperature(-5.0), 16.0);
        assert_eq!(clamp_climate_temperature(f64::NAN), 16.0);
        assert_eq!(clamp_fan_speed(0), 1);
        assert_eq!(clamp_fan_speed(9), 5);
    }

    #[tokio::test]
    async fn test_volume_is_clamped_in_store() {
        let (controls, store) = controls();
        controls.set_volume(150).await;
        assert_eq!(store.snapshot().await.media_info.volume, 100);
        controls.set_volume(-10).await;
        assert_eq!(store.snapshot().await.media_info.volume, 0);
    }

    #[tokio::test]
    async fn test_climate_setters() {
        let (controls, store) = controls();
        assert_eq!(controls.set_climate_temperature(31.5).await, 30.0);
        assert_eq!(controls.set_climate_fan_speed(-3).await, 1);
        controls.set_climate_enabled(true).await;

        let climate = store.snapshot().await.climate_control;
        assert_eq!(climate.temperature, 30.0);
        assert_eq!(climate.fan_speed, 1);
        assert!(climate.is_enabled);
    }

    #[tokio::test]
    async fn test_mode_cycles() {
        let (controls, store) = controls();
        assert_eq!(store.snapshot().await.climate_control.mode, ClimateMode::Auto);
        assert_eq!(controls.toggle_climate_mode().await, ClimateMode::Manual);
        assert_eq!(controls.toggle_climate_mode().await, ClimateMode::Defrost);
        assert_eq!(controls.toggle_climate_mode().await, ClimateMode::Auto);
    }

    #[tokio::test]
    async fn test_play_pause_toggles() {
        let (controls, store) = controls();
        assert!(controls.toggle_play_pause().await);
        assert!(store.snapshot().await.media_info.is_playing);
        assert!(!controls.toggle_play_pause().await);
    }
}
