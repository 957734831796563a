//! Error types for fallback-sim
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Result type alias for fallback-sim operations
pub type Result<T> = std::result::Result<T, FallbackError>;

/// Main error type for fallback-sim operations
#[derive(Error, Debug)]
pub enum FallbackError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Event store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Tabular dataset error
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
}

/// Errors raised while validating a configuration, before any generation starts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Duration is zero, negative or not finite
    #[error("Invalid duration: {hours} hours (must be positive)")]
    InvalidDuration { hours: f64 },

    /// Sampling interval is zero
    #[error("Invalid sampling interval: {minutes} minutes (must be positive)")]
    InvalidInterval { minutes: u32 },

    /// Duration is not a whole number of intervals
    #[error("Interval of {interval_minutes} minutes does not divide a duration of {duration_minutes} minutes")]
    IntervalNotDivisor {
        duration_minutes: f64,
        interval_minutes: u32,
    },

    /// Probability outside [0, 1]
    #[error("Invalid dropout probability: {0} (must be within 0.0..=1.0)")]
    InvalidProbability(f64),

    /// Noise standard deviation negative or not finite
    #[error("Invalid noise standard deviation: {0}")]
    InvalidNoise(f64),

    /// Last sample's timestamp falls outside the representable calendar
    #[error("Run of {sample_count} samples every {interval_minutes} minutes ends beyond the supported calendar")]
    TimestampOverflow {
        sample_count: usize,
        interval_minutes: u32,
    },

    /// Chunk length of zero
    #[error("Invalid chunk length: must be at least one sample")]
    InvalidChunkLength,

    /// Epoch string could not be parsed
    #[error("Invalid start time '{0}' (expected YYYY-MM-DD HH:MM:SS)")]
    InvalidStartTime(String),

    /// Configuration file could not be read or parsed
    #[error("Cannot load configuration: {0}")]
    Load(String),
}

/// Errors from the persistent event store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying SQLite failure (unavailable file, write error, ...)
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored row could not be interpreted as a fallback event
    #[error("Corrupt row {id}: {reason}")]
    Corrupt { id: i64, reason: String },
}

/// Errors reading or writing the tabular sample file
#[derive(Error, Debug)]
pub enum DatasetError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV framing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Required header column absent
    #[error("Missing column: {0}")]
    MissingColumn(String),
}
