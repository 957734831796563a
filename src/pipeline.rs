// Fallback Sim - Sensor telemetry simulator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Streaming pipeline: generate → classify → log.
//!
//! Samples flow one at a time; nothing is materialised twice. The
//! classifier sees the rounded values that are emitted (and written to the
//! CSV file), so a persisted sample always reclassifies the same way.

use crate::classifier::{Classification, Classifier, ReasonCounts};
use crate::dataset::{RowOutcome, RowWarning, SampleReader, SampleWriter};
use crate::error::Result;
use crate::generator::SignalGenerator;
use crate::logger::EventLogger;
use crate::sample::Sample;
use crate::store::EventStore;
use serde::Serialize;
use std::io::{Read, Write};

/// Counters for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Samples classified
    pub samples: usize,
    /// Samples with at least one reason
    pub flagged: usize,
    /// Rows appended to the store
    pub inserted: usize,
    /// Reason tally
    pub reasons: ReasonCounts,
    /// Input rows skipped (replay only)
    #[serde(skip)]
    pub skipped: Vec<RowWarning>,
}

/// Classifier plus logger, driven sample by sample.
#[derive(Debug)]
pub struct Pipeline<S: EventStore> {
    classifier: Classifier,
    logger: EventLogger<S>,
}

impl<S: EventStore> Pipeline<S> {
    /// Assemble a pipeline.
    pub fn new(classifier: Classifier, logger: EventLogger<S>) -> Self {
        Self { classifier, logger }
    }

    /// Classify one sample and log it if flagged.
    pub fn process(&mut self, sample: &Sample) -> Result<Classification> {
        let classification = self.classifier.classify(sample);
        self.logger.log(sample, &classification)?;
        Ok(classification)
    }

    /// Push any sequence of samples through the pipeline. `observe` sees
    /// every sample with its classification after it has been logged.
    pub fn run_samples<I, F>(&mut self, samples: I, mut observe: F) -> Result<RunSummary>
    where
        I: IntoIterator<Item = Sample>,
        F: FnMut(&Sample, &Classification) -> Result<()>,
    {
        let mut summary = RunSummary::default();
        let inserted_before = self.logger.inserted();

        for sample in samples {
            let classification = self.process(&sample)?;
            summary.samples += 1;
            if classification.fallback_active() {
                summary.flagged += 1;
                summary.reasons.record(&classification);
            }
            observe(&sample, &classification)?;
        }

        summary.inserted = self.logger.inserted() - inserted_before;
        log::info!(
            "processed {} samples, {} flagged, {} events logged",
            summary.samples,
            summary.flagged,
            summary.inserted
        );
        Ok(summary)
    }

    /// Run a full generated series.
    pub fn run(&mut self, generator: &SignalGenerator) -> Result<RunSummary> {
        self.run_samples(generator.samples(), |_, _| Ok(()))
    }

    /// Run a full generated series, also writing every sample to CSV.
    pub fn run_with_csv<W: Write>(
        &mut self,
        generator: &SignalGenerator,
        writer: &mut SampleWriter<W>,
    ) -> Result<RunSummary> {
        self.run_samples(generator.samples(), |sample, classification| {
            writer.write(sample, classification)?;
            Ok(())
        })
    }

    /// Generate on `threads` threads, then classify and log in timestamp order.
    pub fn run_parallel(
        &mut self,
        generator: &SignalGenerator,
        threads: usize,
    ) -> Result<RunSummary> {
        self.run_samples(generator.generate_parallel(threads), |_, _| Ok(()))
    }

    /// Parallel generation with every sample also written to CSV.
    pub fn run_parallel_with_csv<W: Write>(
        &mut self,
        generator: &SignalGenerator,
        threads: usize,
        writer: &mut SampleWriter<W>,
    ) -> Result<RunSummary> {
        self.run_samples(generator.generate_parallel(threads), |sample, classification| {
            writer.write(sample, classification)?;
            Ok(())
        })
    }

    /// Re-classify and log the samples of a CSV file. Malformed rows are
    /// skipped and reported in the summary.
    pub fn replay<R: Read>(&mut self, reader: SampleReader<R>) -> Result<RunSummary> {
        let mut skipped = Vec::new();
        let mut rows = reader;
        let mut failure = None;

        let samples = std::iter::from_fn(|| loop {
            match rows.next()? {
                Ok(RowOutcome::Sample(sample)) => return Some(sample),
                Ok(RowOutcome::Skipped(warning)) => skipped.push(warning),
                Err(e) => {
                    failure = Some(e);
                    return None;
                }
            }
        });

        let mut summary = self.run_samples(samples, |_, _| Ok(()))?;
        if let Some(e) = failure {
            return Err(e.into());
        }
        if !skipped.is_empty() {
            log::warn!("{} malformed rows skipped", skipped.len());
        }
        summary.skipped = skipped;
        Ok(summary)
    }

    /// Classifier in use.
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Logger in use.
    pub fn logger(&self) -> &EventLogger<S> {
        &self.logger
    }

    /// Mutable logger access (truncate, audit).
    pub fn logger_mut(&mut self) -> &mut EventLogger<S> {
        &mut self.logger
    }

    /// Hand back the logger.
    pub fn into_logger(self) -> EventLogger<S> {
        self.logger
    }
}
