// Fallback Sim - Sensor telemetry simulator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Anomaly windows injected into generated channels.
//!
//! A window is a contiguous band on the reference grid (one position per
//! 5 simulated minutes) during which a channel's baseline is shifted and
//! its noise widened. Positions are converted to sample indices with the
//! configured interval, so a window keeps its wall-clock placement when the
//! sampling rate changes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Sampling interval, in minutes, that reference positions are expressed in.
pub const REFERENCE_INTERVAL_MINUTES: f64 = 5.0;

/// Kind of injected event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Temperature pushed upward
    HeatStress,
    /// Moisture pulled downward
    DryOut,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyKind::HeatStress => write!(f, "heat_stress"),
            AnomalyKind::DryOut => write!(f, "dry_out"),
        }
    }
}

/// Anomaly window configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyWindow {
    /// What the window simulates.
    pub kind: AnomalyKind,
    /// Exclusive lower bound on the reference grid.
    pub start: f64,
    /// Exclusive upper bound on the reference grid.
    pub end: f64,
    /// Added to the baseline while active.
    pub offset: f64,
    /// Noise standard deviation while active (replaces the channel's).
    pub noise_std: f64,
}

impl AnomalyWindow {
    /// Create a new window.
    pub fn new(kind: AnomalyKind, start: f64, end: f64, offset: f64, noise_std: f64) -> Self {
        Self {
            kind,
            start,
            end,
            offset,
            noise_std,
        }
    }

    /// Heat stress: +10 °C for `500 < x < 600`, σ = 0.5.
    pub fn heat_stress() -> Self {
        Self::new(AnomalyKind::HeatStress, 500.0, 600.0, 10.0, 0.5)
    }

    /// Dry-out: −25 % for `1000 < x < 1100`, σ = 1.0.
    pub fn dry_out() -> Self {
        Self::new(AnomalyKind::DryOut, 1000.0, 1100.0, -25.0, 1.0)
    }

    /// Check if the window is active at a reference-grid position.
    pub fn is_active(&self, position: f64) -> bool {
        self.start < position && position < self.end
    }

    /// Sample indices covered by the window at the given interval,
    /// clipped to `sample_count`.
    pub fn index_range(&self, interval_minutes: u32, sample_count: usize) -> Range<usize> {
        let scale = REFERENCE_INTERVAL_MINUTES / interval_minutes as f64;
        let lo = self.start * scale;
        let hi = self.end * scale;

        // Smallest index strictly above lo, largest strictly below hi.
        let first = (lo.floor() + 1.0).max(0.0) as usize;
        let last_exclusive = hi.ceil().max(0.0) as usize;

        let first = first.min(sample_count);
        let last_exclusive = last_exclusive.clamp(first, sample_count);
        first..last_exclusive
    }
}
