// Fallback Sim - Sensor telemetry simulator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Sample types
//!
//! A [`Sample`] is one reading of every channel at one instant. Samples are
//! created by the generator (or read back from a CSV file) and never
//! mutated afterwards.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Fixed pattern used for every persisted or exported timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One multi-channel sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// 0-based position in the run
    pub index: usize,
    /// Absolute time of the reading
    pub timestamp: NaiveDateTime,
    /// Air temperature in °C (2 decimals)
    pub temperature_c: f64,
    /// Soil moisture in percent (1 decimal), `None` on sensor dropout
    pub moisture_pct: Option<f64>,
    /// CO₂ concentration in ppm (integer valued)
    pub co2_ppm: f64,
    /// Illuminance in lux (integer valued)
    pub light_lux: f64,
}

impl Sample {
    /// Create a sample from raw channel values, applying the emission rounding.
    pub fn new(
        index: usize,
        timestamp: NaiveDateTime,
        temperature_c: f64,
        moisture_pct: Option<f64>,
        co2_ppm: f64,
        light_lux: f64,
    ) -> Self {
        Self {
            index,
            timestamp,
            temperature_c: round_to(temperature_c, 2),
            moisture_pct: moisture_pct.map(|m| round_to(m, 1)),
            co2_ppm: co2_ppm.round(),
            light_lux: light_lux.round(),
        }
    }

    /// Timestamp rendered as `YYYY-MM-DD HH:MM:SS`.
    pub fn formatted_timestamp(&self) -> String {
        format_timestamp(&self.timestamp)
    }

    /// True when the moisture reading is missing.
    pub fn is_moisture_dropout(&self) -> bool {
        self.moisture_pct.is_none()
    }
}

/// Render a timestamp with [`TIMESTAMP_FORMAT`].
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
