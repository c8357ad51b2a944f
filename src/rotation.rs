//! Idle globe spin
//!
//! Each animation frame the camera longitude moves by
//! `(360 / seconds_per_revolution) / frames_per_second` degrees, tapering
//! linearly to zero between the slow-spin zoom and the max-spin zoom.

use std::time::Duration;

use crate::config::SpinConfig;
use crate::map::{CameraOptions, LngLat, MapHost};

/// Duration of the per-frame ease; near zero so the motion is continuous
const SPIN_STEP: Duration = Duration::from_millis(1);

pub struct RotationController {
    config: SpinConfig,
    enabled: bool,
    interacting: bool,
}

impl RotationController {
    pub fn new(config: SpinConfig) -> Self {
        let enabled = config.enabled;
        Self { config, enabled, interacting: false }
    }

    #[cfg(test)]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[cfg(test)]
    pub fn is_interacting(&self) -> bool {
        self.interacting
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            tracing::debug!("Globe spin {}", if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;
    }

    /// Longitude change in degrees for one frame at `zoom`
    pub fn delta(&self, zoom: f64) -> f64 {
        spin_delta(&self.config, zoom, self.interacting, self.enabled)
    }

    /// Advance the camera by one frame of spin
    pub fn tick(&mut self, host: &mut impl MapHost) {
        // A selection flight owns the camera until it lands
        if host.is_flying() {
            return;
        }
        let delta = self.delta(host.zoom());
        if delta == 0.0 {
            return;
        }
        let center = host.center();
        host.ease_to(CameraOptions::center(LngLat::new(center.lng - delta, center.lat), SPIN_STEP));
    }

    pub fn pointer_down(&mut self) {
        self.interacting = true;
    }

    /// Pointer-up and touch-end both end the interaction and spin once
    pub fn pointer_up(&mut self, host: &mut impl MapHost) {
        self.interacting = false;
        self.tick(host);
    }
}

/// Pure spin rate: zero when disabled, interacting, or zoomed past the limit
pub fn spin_delta(config: &SpinConfig, zoom: f64, interacting: bool, enabled: bool) -> f64 {
    if !enabled || interacting || zoom >= config.max_spin_zoom {
        return 0.0;
    }
    let mut degrees_per_second = 360.0 / config.seconds_per_revolution;
    if zoom > config.slow_spin_zoom {
        let fraction = (config.max_spin_zoom - zoom) / (config.max_spin_zoom - config.slow_spin_zoom);
        degrees_per_second *= fraction;
    }
    degrees_per_second / config.frames_per_second
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::testing::RecordingHost;

    const FULL_SPEED: f64 = 360.0 / 120.0 / 60.0;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_no_spin_at_or_above_max_zoom() {
        let cfg = SpinConfig::default();
        for zoom in [5.0, 5.01, 8.0, 22.0] {
            assert_eq!(spin_delta(&cfg, zoom, false, true), 0.0, "zoom {zoom}");
        }
    }

    #[test]
    fn test_full_speed_below_slow_zoom() {
        let cfg = SpinConfig::default();
        assert!(approx(spin_delta(&cfg, 0.0, false, true), FULL_SPEED));
        assert!(approx(spin_delta(&cfg, 3.0, false, true), FULL_SPEED));
    }

    #[test]
    fn test_linear_slowdown_between_thresholds() {
        let cfg = SpinConfig::default();
        assert!(approx(spin_delta(&cfg, 4.0, false, true), FULL_SPEED * 0.5));
        assert!(approx(spin_delta(&cfg, 3.5, false, true), FULL_SPEED * 0.75));
        assert!(approx(spin_delta(&cfg, 4.75, false, true), FULL_SPEED * 0.125));

        let near_max = spin_delta(&cfg, 4.999_999, false, true);
        assert!(near_max > 0.0 && near_max < 1e-6);
    }

    #[test]
    fn test_interaction_and_disable_stop_spin() {
        let cfg = SpinConfig::default();
        assert_eq!(spin_delta(&cfg, 1.0, true, true), 0.0);
        assert_eq!(spin_delta(&cfg, 1.0, false, false), 0.0);
    }

    #[test]
    fn test_tick_eases_longitude_westward() {
        let mut host = RecordingHost::at_zoom(3.0);
        let mut spin = RotationController::new(SpinConfig::default());

        spin.tick(&mut host);

        let eases = host.ease_calls();
        assert_eq!(eases.len(), 1);
        assert_eq!(eases[0].duration, SPIN_STEP);
        assert!(approx(eases[0].center.unwrap().lng, -FULL_SPEED));
        assert_eq!(eases[0].center.unwrap().lat, 20.0);
    }

    #[test]
    fn test_tick_is_noop_when_zoomed_in() {
        let mut host = RecordingHost::at_zoom(6.0);
        let mut spin = RotationController::new(SpinConfig::default());
        spin.tick(&mut host);
        assert!(host.camera_calls.is_empty());
    }

    #[test]
    fn test_tick_does_not_interrupt_flight() {
        let mut host = RecordingHost::at_zoom(3.0);
        host.flying = true;
        let mut spin = RotationController::new(SpinConfig::default());
        spin.tick(&mut host);
        assert!(host.camera_calls.is_empty());
    }

    #[test]
    fn test_pointer_up_resumes_with_one_step() {
        let mut host = RecordingHost::at_zoom(2.0);
        let mut spin = RotationController::new(SpinConfig::default());

        spin.pointer_down();
        assert!(spin.is_interacting());
        spin.tick(&mut host);
        assert!(host.camera_calls.is_empty());

        spin.pointer_up(&mut host);
        assert!(!spin.is_interacting());
        assert_eq!(host.ease_calls().len(), 1);
    }

    #[test]
    fn test_disabled_in_config() {
        let cfg = SpinConfig { enabled: false, ..SpinConfig::default() };
        let spin = RotationController::new(cfg);
        assert!(!spin.is_enabled());
        assert_eq!(spin.delta(1.0), 0.0);
    }
}
