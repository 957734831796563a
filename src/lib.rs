//! # Fallback Sim - Environmental sensor telemetry simulator
//!
//! Synthesizes a multi-channel sensor stream (temperature, moisture, CO₂,
//! light), classifies every sample against fallback rules, and appends the
//! anomalous ones to a CRC-32 protected event log.
//!
//! ## Key Features
//!
//! - **Parametric signals**: sinusoidal baselines, Gaussian noise and
//!   injected heat-stress / dry-out windows
//! - **Reproducible**: seeded, restartable, chunk-parallel generation
//! - **Multi-rule classifier**: ordered, non-exclusive reason codes with
//!   first-class handling of missing moisture readings
//! - **Integrity-checked log**: every row carries a CRC-32 of its canonical
//!   string and can be audited after the fact
//!
//! ## Quick Start
//!
//! ```rust
//! use fallback_sim::{
//!     Classifier, EventLogger, EventStore, GeneratorConfig, MemoryStore, Pipeline,
//!     SignalGenerator,
//! };
//!
//! let generator = SignalGenerator::new(
//!     GeneratorConfig::new()
//!         .with_duration_hours(24.0)
//!         .with_seed(42)
//!         .with_moisture_dropout(0.01),
//! )
//! .unwrap();
//!
//! let logger = EventLogger::new(MemoryStore::new()).unwrap();
//! let mut pipeline = Pipeline::new(Classifier::default(), logger);
//! let summary = pipeline.run(&generator).unwrap();
//!
//! assert_eq!(summary.samples, 288);
//! assert_eq!(summary.inserted, pipeline.logger().store().count().unwrap());
//! assert!(pipeline.logger().audit().unwrap().is_intact());
//! ```
//!
//! ## Modules
//!
//! - [`sample`]: Sample type and timestamp format
//! - [`signal`]: Per-channel signal models
//! - [`anomalies`]: Injected anomaly windows
//! - [`generator`]: Sample stream generation
//! - [`classifier`]: Fallback rules and reason codes
//! - [`checksum`]: CRC-32 over canonical row strings
//! - [`store`]: Event store contract, SQLite and in-memory backends
//! - [`logger`]: Event logging and integrity audit
//! - [`dataset`]: CSV sample files
//! - [`config`]: Run configuration
//! - [`pipeline`]: Streaming generate → classify → log

// Modules
pub mod anomalies;
pub mod checksum;
pub mod classifier;
pub mod config;
pub mod dataset;
pub mod error;
pub mod generator;
pub mod logger;
pub mod pipeline;
pub mod sample;
pub mod signal;
pub mod store;

// Re-exports for convenient access
pub use anomalies::{AnomalyKind, AnomalyWindow};
pub use checksum::{canonical_string, crc32_hex, join_reasons, row_crc};
pub use classifier::{Classification, Classifier, ClassifierConfig, ReasonCode, ReasonCounts};
pub use config::{parse_start_time, SimulationConfig};
pub use dataset::{RowOutcome, RowWarning, SampleReader, SampleWriter};
pub use error::{ConfigError, DatasetError, FallbackError, Result, StoreError};
pub use generator::{GeneratorConfig, SignalGenerator};
pub use logger::{verify_events, EventLogger, IntegrityReport};
pub use pipeline::{Pipeline, RunSummary};
pub use sample::{Sample, TIMESTAMP_FORMAT};
pub use signal::{ChannelModel, LightCycle, Sinusoid};
pub use store::{EventStore, FallbackEvent, MemoryStore, NewEvent, SqliteStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_basic_pipeline() {
        let generator =
            SignalGenerator::new(GeneratorConfig::new().with_duration_hours(1.0).with_seed(1))
                .unwrap();
        let mut pipeline = Pipeline::new(
            Classifier::default(),
            EventLogger::new(SqliteStore::open_in_memory().unwrap()).unwrap(),
        );

        let summary = pipeline.run(&generator).unwrap();
        assert_eq!(summary.samples, 12);
        assert_eq!(summary.inserted, 0);
    }
}
