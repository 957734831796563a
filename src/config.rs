// Fallback Sim - Sensor telemetry simulator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Simulation configuration
//!
//! Everything a run needs, loadable from a JSON file. Every field has a
//! default, so a file only has to name what it changes:
//!
//! ```json
//! { "generator": { "duration_hours": 96, "seed": 7 },
//!   "database_path": "fallback_events.db" }
//! ```

use crate::classifier::ClassifierConfig;
use crate::error::ConfigError;
use crate::generator::GeneratorConfig;
use crate::sample::TIMESTAMP_FORMAT;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default event database file
pub const DEFAULT_DATABASE_PATH: &str = "fallback_events.db";

/// Default sample file
pub const DEFAULT_CSV_PATH: &str = "simulated_sensor_data.csv";

/// Run-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Signal generation
    pub generator: GeneratorConfig,
    /// Classification thresholds
    pub classifier: ClassifierConfig,
    /// SQLite file for fallback events (`None` = in-memory only)
    pub database_path: Option<PathBuf>,
    /// Sample CSV output (`None` = not written)
    pub csv_path: Option<PathBuf>,
    /// Empty the event table before logging
    pub truncate_before_run: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            classifier: ClassifierConfig::default(),
            database_path: Some(PathBuf::from(DEFAULT_DATABASE_PATH)),
            csv_path: Some(PathBuf::from(DEFAULT_CSV_PATH)),
            truncate_before_run: false,
        }
    }
}

impl SimulationConfig {
    /// Create a default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))
    }

    /// Load from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Load(e.to_string()))
    }

    /// Replace generator settings
    pub fn with_generator(mut self, generator: GeneratorConfig) -> Self {
        self.generator = generator;
        self
    }

    /// Replace classifier thresholds
    pub fn with_classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.classifier = classifier;
        self
    }

    /// Set or clear the event database path
    pub fn with_database_path(mut self, path: Option<PathBuf>) -> Self {
        self.database_path = path;
        self
    }

    /// Set or clear the sample CSV path
    pub fn with_csv_path(mut self, path: Option<PathBuf>) -> Self {
        self.csv_path = path;
        self
    }

    /// Empty the event table before the run
    pub fn with_truncate(mut self, truncate: bool) -> Self {
        self.truncate_before_run = truncate;
        self
    }

    /// Validate generator settings and return the sample count
    pub fn validate(&self) -> Result<usize, ConfigError> {
        self.generator.validate()
    }
}

/// Parse a `YYYY-MM-DD HH:MM:SS` run epoch
pub fn parse_start_time(value: &str) -> Result<NaiveDateTime, ConfigError> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT)
        .map_err(|_| ConfigError::InvalidStartTime(value.to_string()))
}
