// Fallback Sim - Sensor telemetry simulator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Signal generator.
//!
//! Produces a lazy, finite and restartable stream of [`Sample`]s. The random
//! stream is reseeded at every chunk boundary from the run seed and the
//! chunk index, so any chunk can be regenerated on its own (or on another
//! thread) and comes out identical to the sequential stream.

use crate::anomalies::REFERENCE_INTERVAL_MINUTES;
use crate::error::ConfigError;
use crate::sample::Sample;
use crate::signal::{ChannelModel, LightCycle};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::xxh64;

/// Default chunk length: one simulated day at 5-minute sampling.
pub const DEFAULT_CHUNK_LEN: usize = 288;

/// Generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Simulated duration in hours.
    pub duration_hours: f64,
    /// Interval between samples in minutes.
    pub interval_minutes: u32,
    /// Timestamp of the first sample.
    pub start_time: NaiveDateTime,
    /// Random seed for reproducibility (drawn once per generator if absent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Probability that any given moisture reading is missing.
    pub moisture_dropout_probability: f64,
    /// Samples per independently seeded chunk.
    pub chunk_len: usize,
    /// Temperature channel model.
    pub temperature: ChannelModel,
    /// Moisture channel model.
    pub moisture: ChannelModel,
    /// CO₂ channel model.
    pub co2: ChannelModel,
    /// Light cycle.
    pub light: LightCycle,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            duration_hours: 72.0,
            interval_minutes: 5,
            start_time: default_start_time(),
            seed: None,
            moisture_dropout_probability: 0.0,
            chunk_len: DEFAULT_CHUNK_LEN,
            temperature: ChannelModel::temperature(),
            moisture: ChannelModel::moisture(),
            co2: ChannelModel::co2(),
            light: LightCycle::default(),
        }
    }
}

/// 2024-01-01 00:00:00
fn default_start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

impl GeneratorConfig {
    /// Create a new generator config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set duration in hours.
    pub fn with_duration_hours(mut self, hours: f64) -> Self {
        self.duration_hours = hours;
        self
    }

    /// Set sampling interval in minutes.
    pub fn with_interval_minutes(mut self, minutes: u32) -> Self {
        self.interval_minutes = minutes;
        self
    }

    /// Set the first timestamp.
    pub fn with_start_time(mut self, start: NaiveDateTime) -> Self {
        self.start_time = start;
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set moisture dropout probability.
    pub fn with_moisture_dropout(mut self, probability: f64) -> Self {
        self.moisture_dropout_probability = probability;
        self
    }

    /// Set chunk length.
    pub fn with_chunk_len(mut self, chunk_len: usize) -> Self {
        self.chunk_len = chunk_len;
        self
    }

    /// Replace the temperature model.
    pub fn with_temperature(mut self, model: ChannelModel) -> Self {
        self.temperature = model;
        self
    }

    /// Replace the moisture model.
    pub fn with_moisture(mut self, model: ChannelModel) -> Self {
        self.moisture = model;
        self
    }

    /// Replace the CO₂ model.
    pub fn with_co2(mut self, model: ChannelModel) -> Self {
        self.co2 = model;
        self
    }

    /// Duration in minutes.
    pub fn duration_minutes(&self) -> f64 {
        self.duration_hours * 60.0
    }

    /// Validate and return the number of samples.
    pub fn validate(&self) -> Result<usize, ConfigError> {
        if !self.duration_hours.is_finite() || self.duration_hours <= 0.0 {
            return Err(ConfigError::InvalidDuration {
                hours: self.duration_hours,
            });
        }
        if self.interval_minutes == 0 {
            return Err(ConfigError::InvalidInterval {
                minutes: self.interval_minutes,
            });
        }

        let duration_minutes = self.duration_minutes();
        let steps = duration_minutes / self.interval_minutes as f64;
        if (steps - steps.round()).abs() > 1e-9 || steps < 1.0 {
            return Err(ConfigError::IntervalNotDivisor {
                duration_minutes,
                interval_minutes: self.interval_minutes,
            });
        }

        let sample_count = steps.round() as usize;
        if offset_time(self.start_time, self.interval_minutes, sample_count - 1).is_none() {
            return Err(ConfigError::TimestampOverflow {
                sample_count,
                interval_minutes: self.interval_minutes,
            });
        }

        if !(0.0..=1.0).contains(&self.moisture_dropout_probability) {
            return Err(ConfigError::InvalidProbability(
                self.moisture_dropout_probability,
            ));
        }
        if self.chunk_len == 0 {
            return Err(ConfigError::InvalidChunkLength);
        }

        self.temperature.validate()?;
        self.moisture.validate()?;
        self.co2.validate()?;

        Ok(sample_count)
    }
}

/// `start + index * interval`, or `None` past the calendar's range.
fn offset_time(start: NaiveDateTime, interval_minutes: u32, index: usize) -> Option<NaiveDateTime> {
    let minutes = i64::try_from(index)
        .ok()?
        .checked_mul(i64::from(interval_minutes))?;
    start.checked_add_signed(Duration::try_minutes(minutes)?)
}

/// Generator for one simulated run.
///
/// The generator owns its seed; every call to [`SignalGenerator::samples`]
/// replays the same run from the beginning.
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    config: GeneratorConfig,
    seed: u64,
    sample_count: usize,
}

impl SignalGenerator {
    /// Create a generator, failing fast on an invalid configuration.
    pub fn new(config: GeneratorConfig) -> Result<Self, ConfigError> {
        let sample_count = config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random::<u64>);
        log::debug!(
            "generator ready: {} samples every {} min, seed {}",
            sample_count,
            config.interval_minutes,
            seed
        );
        Ok(Self {
            config,
            seed,
            sample_count,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Seed in use (drawn at construction if the config had none).
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of samples in a full run.
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Number of chunks in a full run.
    pub fn chunk_count(&self) -> usize {
        let chunk_len = self.config.chunk_len;
        self.sample_count / chunk_len + usize::from(self.sample_count % chunk_len != 0)
    }

    /// Stream the whole run from the first sample.
    pub fn samples(&self) -> Samples<'_> {
        self.stream(0, self.sample_count)
    }

    /// Generate one chunk.
    pub fn generate_chunk(&self, chunk: usize) -> Vec<Sample> {
        let start = chunk
            .saturating_mul(self.config.chunk_len)
            .min(self.sample_count);
        let end = start
            .saturating_add(self.config.chunk_len)
            .min(self.sample_count);
        self.stream(start, end).collect()
    }

    /// Generate the whole run on up to `threads` scoped threads.
    ///
    /// Output is identical to collecting [`SignalGenerator::samples`].
    pub fn generate_parallel(&self, threads: usize) -> Vec<Sample> {
        let threads = threads.max(1).min(self.chunk_count().max(1));
        if threads == 1 {
            return self.samples().collect();
        }

        let chunk_count = self.chunk_count();
        let mut chunks: Vec<(usize, Vec<Sample>)> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|worker| {
                    scope.spawn(move || {
                        (worker..chunk_count)
                            .step_by(threads)
                            .map(|chunk| (chunk, self.generate_chunk(chunk)))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        });

        chunks.sort_by_key(|(chunk, _)| *chunk);
        chunks.into_iter().flat_map(|(_, samples)| samples).collect()
    }

    /// Reference-grid position of a sample index.
    pub fn position(&self, index: usize) -> f64 {
        index as f64 * self.config.interval_minutes as f64 / REFERENCE_INTERVAL_MINUTES
    }

    /// Timestamp of a sample index.
    ///
    /// Validation guarantees every index of the run is representable; past
    /// the end of the calendar this saturates.
    pub fn timestamp(&self, index: usize) -> NaiveDateTime {
        offset_time(self.config.start_time, self.config.interval_minutes, index)
            .unwrap_or(NaiveDateTime::MAX)
    }

    fn stream(&self, start: usize, end: usize) -> Samples<'_> {
        Samples {
            generator: self,
            next: start,
            end,
            rng: self.chunk_rng(start / self.config.chunk_len),
        }
    }

    fn chunk_rng(&self, chunk: usize) -> StdRng {
        StdRng::seed_from_u64(xxh64(&(chunk as u64).to_le_bytes(), self.seed))
    }

    fn sample_at(&self, index: usize, rng: &mut StdRng) -> Sample {
        let x = self.position(index);
        let cfg = &self.config;

        let temperature = cfg.temperature.sample(x, rng);
        let moisture = cfg.moisture.sample(x, rng);
        let co2 = cfg.co2.sample(x, rng);
        let light = cfg.light.evaluate(x);

        let dropped = cfg.moisture_dropout_probability > 0.0
            && rng.gen_bool(cfg.moisture_dropout_probability);
        let moisture = if dropped { None } else { Some(moisture) };

        Sample::new(index, self.timestamp(index), temperature, moisture, co2, light)
    }
}

/// Lazy iterator over a run (or a slice of it).
#[derive(Debug)]
pub struct Samples<'a> {
    generator: &'a SignalGenerator,
    next: usize,
    end: usize,
    rng: StdRng,
}

impl Iterator for Samples<'_> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        if self.next >= self.end {
            return None;
        }
        let sample = self.generator.sample_at(self.next, &mut self.rng);
        self.next += 1;

        let chunk_len = self.generator.config.chunk_len;
        if self.next % chunk_len == 0 {
            self.rng = self.generator.chunk_rng(self.next / chunk_len);
        }
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Samples<'_> {}
