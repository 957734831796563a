// Fallback Sim - Sensor telemetry simulator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Fallback classification module
//!
//! This module maps each sample to the ordered set of fallback reasons
//! that fire for it. Rules are independent and evaluated in a fixed order:
//!
//! 1. `high_temp` - temperature above the high threshold
//! 2. `low_moisture` - moisture present and below the low threshold
//! 3. `moisture_dropout` - moisture reading missing
//! 4. `co2_noise` - CO₂ above the noise threshold
//!
//! A missing moisture reading only ever yields `moisture_dropout`.
//! Light is not a classification input.

use crate::sample::Sample;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reason a sample entered fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// Temperature above threshold
    HighTemp,
    /// Moisture below threshold
    LowMoisture,
    /// Moisture reading missing
    MoistureDropout,
    /// CO₂ above threshold
    Co2Noise,
}

impl ReasonCode {
    /// All codes in evaluation order.
    pub const ALL: [ReasonCode; 4] = [
        ReasonCode::HighTemp,
        ReasonCode::LowMoisture,
        ReasonCode::MoistureDropout,
        ReasonCode::Co2Noise,
    ];

    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::HighTemp => "high_temp",
            ReasonCode::LowMoisture => "low_moisture",
            ReasonCode::MoistureDropout => "moisture_dropout",
            ReasonCode::Co2Noise => "co2_noise",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown reason code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownReason(pub String);

impl fmt::Display for UnknownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown reason code '{}'", self.0)
    }
}

impl std::error::Error for UnknownReason {}

impl FromStr for ReasonCode {
    type Err = UnknownReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReasonCode::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| UnknownReason(s.to_string()))
    }
}

/// Classification result for a sample
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Fired reasons, in evaluation order
    pub reasons: Vec<ReasonCode>,
}

impl Classification {
    /// True iff at least one rule fired.
    pub fn fallback_active(&self) -> bool {
        !self.reasons.is_empty()
    }

    /// Check whether a given reason fired.
    pub fn contains(&self, reason: ReasonCode) -> bool {
        self.reasons.contains(&reason)
    }

    /// Reason names in evaluation order.
    pub fn reason_names(&self) -> Vec<&'static str> {
        self.reasons.iter().map(ReasonCode::as_str).collect()
    }
}

/// Thresholds used by the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// `high_temp` fires strictly above this (°C, default: 35)
    pub high_temp_c: f64,
    /// `low_moisture` fires strictly below this (%, default: 40)
    pub low_moisture_pct: f64,
    /// `co2_noise` fires strictly above this (ppm, default: 800)
    pub co2_noise_ppm: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            high_temp_c: 35.0,
            low_moisture_pct: 40.0,
            co2_noise_ppm: 800.0,
        }
    }
}

/// Fallback classifier
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    /// Create a new classifier with default thresholds
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a classifier with custom thresholds
    pub fn with_config(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Thresholds in use
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify a sample
    pub fn classify(&self, sample: &Sample) -> Classification {
        let mut reasons = Vec::with_capacity(2);

        if sample.temperature_c > self.config.high_temp_c {
            reasons.push(ReasonCode::HighTemp);
        }

        match sample.moisture_pct {
            Some(moisture) if moisture < self.config.low_moisture_pct => {
                reasons.push(ReasonCode::LowMoisture);
            }
            Some(_) => {}
            None => reasons.push(ReasonCode::MoistureDropout),
        }

        if sample.co2_ppm > self.config.co2_noise_ppm {
            reasons.push(ReasonCode::Co2Noise);
        }

        Classification { reasons }
    }
}

/// Per-reason tally over a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReasonCounts {
    pub high_temp: u64,
    pub low_moisture: u64,
    pub moisture_dropout: u64,
    pub co2_noise: u64,
}

impl ReasonCounts {
    /// Create an empty tally
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every reason of a classification
    pub fn record(&mut self, classification: &Classification) {
        for reason in &classification.reasons {
            *self.slot(*reason) += 1;
        }
    }

    /// Count for one reason
    pub fn get(&self, reason: ReasonCode) -> u64 {
        match reason {
            ReasonCode::HighTemp => self.high_temp,
            ReasonCode::LowMoisture => self.low_moisture,
            ReasonCode::MoistureDropout => self.moisture_dropout,
            ReasonCode::Co2Noise => self.co2_noise,
        }
    }

    /// Sum over all reasons
    pub fn total(&self) -> u64 {
        self.high_temp + self.low_moisture + self.moisture_dropout + self.co2_noise
    }

    fn slot(&mut self, reason: ReasonCode) -> &mut u64 {
        match reason {
            ReasonCode::HighTemp => &mut self.high_temp,
            ReasonCode::LowMoisture => &mut self.low_moisture,
            ReasonCode::MoistureDropout => &mut self.moisture_dropout,
            ReasonCode::Co2Noise => &mut self.co2_noise,
        }
    }
}
