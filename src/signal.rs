// Fallback Sim - Sensor telemetry simulator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Per-channel signal models.
//!
//! Every channel is evaluated at a position `x` on the reference grid
//! (`x = index * interval_minutes / 5`), so at 5-minute sampling `x` is
//! simply the sample index.
//!
//! - Temperature: `23 + 5·sin(x/50)`, σ = 0.2, heat stress window
//! - Moisture: `60 + 10·sin(x/80)`, σ = 0.5, dry-out window
//! - CO₂: `400 + 20·sin(x/70)`, σ = 5
//! - Light: 288-position day, first 60 positions dark,
//!   then `500 + 100·sin((phase − 60)/50)`

use crate::anomalies::AnomalyWindow;
use crate::error::ConfigError;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Sinusoidal baseline `offset + amplitude * sin(x / divisor)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sinusoid {
    pub offset: f64,
    pub amplitude: f64,
    pub divisor: f64,
}

impl Sinusoid {
    /// Create a new baseline.
    pub fn new(offset: f64, amplitude: f64, divisor: f64) -> Self {
        Self {
            offset,
            amplitude,
            divisor,
        }
    }

    /// Evaluate at a reference-grid position.
    pub fn evaluate(&self, position: f64) -> f64 {
        self.offset + self.amplitude * (position / self.divisor).sin()
    }
}

/// Model for a noisy sinusoidal channel with an optional anomaly window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelModel {
    /// Deterministic baseline.
    pub baseline: Sinusoid,
    /// Standard deviation of Gaussian noise outside any window.
    pub noise_std: f64,
    /// Injected anomaly (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<AnomalyWindow>,
}

impl ChannelModel {
    /// Create a channel without an anomaly window.
    pub fn new(baseline: Sinusoid, noise_std: f64) -> Self {
        Self {
            baseline,
            noise_std,
            window: None,
        }
    }

    /// Attach an anomaly window.
    pub fn with_window(mut self, window: AnomalyWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Reference temperature channel (°C).
    pub fn temperature() -> Self {
        Self::new(Sinusoid::new(23.0, 5.0, 50.0), 0.2).with_window(AnomalyWindow::heat_stress())
    }

    /// Reference soil moisture channel (%).
    pub fn moisture() -> Self {
        Self::new(Sinusoid::new(60.0, 10.0, 80.0), 0.5).with_window(AnomalyWindow::dry_out())
    }

    /// Reference CO₂ channel (ppm).
    pub fn co2() -> Self {
        Self::new(Sinusoid::new(400.0, 20.0, 70.0), 5.0)
    }

    /// Active window at `position`, if any.
    pub fn active_window(&self, position: f64) -> Option<&AnomalyWindow> {
        self.window.as_ref().filter(|w| w.is_active(position))
    }

    /// Noise-free value at `position`, window offset included.
    pub fn baseline_at(&self, position: f64) -> f64 {
        let base = self.baseline.evaluate(position);
        match self.active_window(position) {
            Some(window) => base + window.offset,
            None => base,
        }
    }

    /// Noise standard deviation in effect at `position`.
    pub fn noise_std_at(&self, position: f64) -> f64 {
        match self.active_window(position) {
            Some(window) => window.noise_std,
            None => self.noise_std,
        }
    }

    /// Draw one unrounded value at `position`.
    pub fn sample<R: Rng + ?Sized>(&self, position: f64, rng: &mut R) -> f64 {
        self.baseline_at(position) + gaussian(self.noise_std_at(position), rng)
    }

    /// Check noise parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_std(self.noise_std)?;
        if let Some(window) = &self.window {
            check_std(window.noise_std)?;
        }
        Ok(())
    }
}

/// Day/night light cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightCycle {
    /// Cycle length on the reference grid (288 = 24 h at 5 min).
    pub period: f64,
    /// Leading positions of each cycle with lights off.
    pub off_positions: f64,
    /// Level once the lights are on.
    pub on_level: f64,
    /// Amplitude of the on-phase sinusoid.
    pub amplitude: f64,
    /// Divisor of the on-phase sinusoid.
    pub divisor: f64,
}

impl Default for LightCycle {
    fn default() -> Self {
        Self {
            period: 288.0,
            off_positions: 60.0,
            on_level: 500.0,
            amplitude: 100.0,
            divisor: 50.0,
        }
    }
}

impl LightCycle {
    /// Position within the current cycle.
    pub fn phase(&self, position: f64) -> f64 {
        position.rem_euclid(self.period)
    }

    /// Light level at `position`; exactly 0 while off.
    pub fn evaluate(&self, position: f64) -> f64 {
        let phase = self.phase(position);
        if phase < self.off_positions {
            return 0.0;
        }
        self.on_level + self.amplitude * ((phase - self.off_positions) / self.divisor).sin()
    }
}

fn gaussian<R: Rng + ?Sized>(std_dev: f64, rng: &mut R) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }
    Normal::new(0.0, std_dev)
        .map(|dist| dist.sample(rng))
        .unwrap_or(0.0)
}

fn check_std(std_dev: f64) -> Result<(), ConfigError> {
    if std_dev.is_finite() && std_dev >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidNoise(std_dev))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_temperature_baseline() {
        let model = ChannelModel::temperature();
        assert_relative_eq!(model.baseline_at(0.0), 23.0);
        assert_relative_eq!(model.baseline_at(100.0), 23.0 + 5.0 * 2.0f64.sin());
    }

    #[test]
    fn test_heat_stress_offset_and_noise() {
        let model = ChannelModel::temperature();
        let outside = 23.0 + 5.0 * (550.0f64 / 50.0).sin();
        assert_relative_eq!(model.baseline_at(550.0), outside + 10.0);
        assert_relative_eq!(model.noise_std_at(550.0), 0.5);
        assert_relative_eq!(model.noise_std_at(450.0), 0.2);
    }

    #[test]
    fn test_dry_out_offset() {
        let model = ChannelModel::moisture();
        let base = 60.0 + 10.0 * (1050.0f64 / 80.0).sin();
        assert_relative_eq!(model.baseline_at(1050.0), base - 25.0);
        assert_relative_eq!(model.noise_std_at(1050.0), 1.0);
    }

    #[test]
    fn test_co2_has_no_window() {
        let model = ChannelModel::co2();
        assert!(model.window.is_none());
        assert_relative_eq!(model.noise_std_at(550.0), 5.0);
    }

    #[test]
    fn test_light_off_phase_is_zero() {
        let light = LightCycle::default();
        for position in 0..60 {
            assert_eq!(light.evaluate(position as f64), 0.0);
            assert_eq!(light.evaluate((288 + position) as f64), 0.0);
        }
        assert_relative_eq!(light.evaluate(60.0), 500.0);
        assert_relative_eq!(light.evaluate(288.0 + 110.0), 500.0 + 100.0 * 1.0f64.sin());
    }

    #[test]
    fn test_noise_free_sample_matches_baseline() {
        let model = ChannelModel::new(Sinusoid::new(10.0, 0.0, 1.0), 0.0);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(model.sample(3.0, &mut rng), 10.0);
    }

    #[test]
    fn test_noise_spread() {
        let model = ChannelModel::co2();
        let mut rng = StdRng::seed_from_u64(42);
        let values: Vec<f64> = (0..2000).map(|_| model.sample(0.0, &mut rng)).collect();
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let variance =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

        assert!((mean - 400.0).abs() < 1.0);
        assert!((variance.sqrt() - 5.0).abs() < 0.5);
    }

    #[test]
    fn test_validate_rejects_negative_noise() {
        let model = ChannelModel::new(Sinusoid::new(0.0, 1.0, 1.0), -1.0);
        assert_eq!(model.validate(), Err(ConfigError::InvalidNoise(-1.0)));

        let model = ChannelModel::co2().with_window(AnomalyWindow::new(
            crate::anomalies::AnomalyKind::DryOut,
            0.0,
            10.0,
            500.0,
            f64::NAN,
        ));
        assert!(model.validate().is_err());
    }
}
