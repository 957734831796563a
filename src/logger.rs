// Fallback Sim - Sensor telemetry simulator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Fallback event logger.
//!
//! The logger owns its store for the lifetime of a run. It turns every
//! classified sample with at least one reason into a checksummed row and
//! appends it; clean samples are ignored. There is no batch transaction:
//! rows written before a failure stay in the store, and re-running the
//! same input appends duplicates.

use crate::classifier::Classification;
use crate::error::StoreError;
use crate::sample::Sample;
use crate::store::{EventStore, FallbackEvent, NewEvent};
use serde::Serialize;

/// Result of re-checking every stored checksum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    /// Rows examined
    pub checked: usize,
    /// Ids whose checksum does not match their fields
    pub corrupted: Vec<i64>,
}

impl IntegrityReport {
    /// True when every row verified.
    pub fn is_intact(&self) -> bool {
        self.corrupted.is_empty()
    }
}

/// Recompute the checksum of every event and parse its reason codes.
pub fn verify_events(events: &[FallbackEvent]) -> IntegrityReport {
    let corrupted = events
        .iter()
        .filter(|event| !event.verify() || event.reason_codes().is_err())
        .map(|event| event.id)
        .collect();
    IntegrityReport {
        checked: events.len(),
        corrupted,
    }
}

/// Writes fallback events to an [`EventStore`].
#[derive(Debug)]
pub struct EventLogger<S: EventStore> {
    store: S,
    inserted: usize,
}

impl<S: EventStore> EventLogger<S> {
    /// Take ownership of a store and make sure its table exists.
    pub fn new(mut store: S) -> Result<Self, StoreError> {
        store.ensure_schema()?;
        Ok(Self { store, inserted: 0 })
    }

    /// Log a classified sample. Returns the stored event, or `None` when
    /// no reason fired.
    pub fn log(
        &mut self,
        sample: &Sample,
        classification: &Classification,
    ) -> Result<Option<FallbackEvent>, StoreError> {
        let event = match NewEvent::from_classified(sample, classification) {
            Some(event) => event,
            None => return Ok(None),
        };

        let id = self.store.append(&event)?;
        self.inserted += 1;
        log::debug!(
            "fallback event {} at {}: {} (crc {})",
            id,
            event.timestamp,
            event.reasons,
            event.crc
        );
        Ok(Some(FallbackEvent::from_new(id, event)))
    }

    /// Events inserted by this logger.
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    /// Re-check every stored row.
    pub fn audit(&self) -> Result<IntegrityReport, StoreError> {
        let report = verify_events(&self.store.events()?);
        if !report.is_intact() {
            log::warn!(
                "{} of {} fallback events failed their checksum: {:?}",
                report.corrupted.len(),
                report.checked,
                report.corrupted
            );
        }
        Ok(report)
    }

    /// Remove all stored events before a fresh run.
    pub fn truncate(&mut self) -> Result<usize, StoreError> {
        let removed = self.store.truncate()?;
        log::info!("truncated {} fallback events", removed);
        Ok(removed)
    }

    /// Borrow the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutably borrow the store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Release the store, surfacing close errors.
    pub fn close(self) -> Result<(), StoreError> {
        self.store.close()
    }
}
