// Fallback Sim - Sensor telemetry simulator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Append-only fallback event store.
//!
//! The [`EventStore`] trait is the write/query contract the logger relies
//! on. [`SqliteStore`] persists to the `fallback_events` table;
//! [`MemoryStore`] keeps rows in a vector for tests and dry runs.

use crate::checksum::{join_reasons, row_crc, REASON_SEPARATOR};
use crate::classifier::{Classification, ReasonCode};
use crate::error::StoreError;
use crate::sample::Sample;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;

/// Destination table.
pub const TABLE_NAME: &str = "fallback_events";

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS fallback_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT,
    reasons TEXT,
    fallback_active INTEGER,
    crc TEXT
)";

/// Event ready to be appended; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewEvent {
    pub timestamp: String,
    pub reasons: String,
    pub fallback_active: i64,
    pub crc: String,
}

impl NewEvent {
    /// Build an event from a timestamp string and fired reasons.
    pub fn new(timestamp: impl Into<String>, reasons: &[ReasonCode]) -> Self {
        let timestamp = timestamp.into();
        let reasons = join_reasons(reasons);
        let fallback_active = 1;
        let crc = row_crc(&timestamp, &reasons, fallback_active);
        Self {
            timestamp,
            reasons,
            fallback_active,
            crc,
        }
    }

    /// Build an event for a classified sample, `None` if nothing fired.
    pub fn from_classified(sample: &Sample, classification: &Classification) -> Option<Self> {
        if !classification.fallback_active() {
            return None;
        }
        Some(Self::new(
            sample.formatted_timestamp(),
            &classification.reasons,
        ))
    }
}

/// Stored fallback event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackEvent {
    pub id: i64,
    pub timestamp: String,
    pub reasons: String,
    pub fallback_active: i64,
    pub crc: String,
}

impl FallbackEvent {
    /// Attach a store-assigned id.
    pub fn from_new(id: i64, event: NewEvent) -> Self {
        Self {
            id,
            timestamp: event.timestamp,
            reasons: event.reasons,
            fallback_active: event.fallback_active,
            crc: event.crc,
        }
    }

    /// Checksum recomputed from the row's fields.
    pub fn expected_crc(&self) -> String {
        row_crc(&self.timestamp, &self.reasons, self.fallback_active)
    }

    /// True when the stored checksum matches the row.
    pub fn verify(&self) -> bool {
        self.crc == self.expected_crc()
    }

    /// Parse the stored reasons back into codes.
    pub fn reason_codes(&self) -> Result<Vec<ReasonCode>, StoreError> {
        if self.reasons.is_empty() {
            return Ok(Vec::new());
        }
        self.reasons
            .split(REASON_SEPARATOR)
            .map(|name| {
                name.parse().map_err(|e| StoreError::Corrupt {
                    id: self.id,
                    reason: format!("{}", e),
                })
            })
            .collect()
    }
}

/// Write/query contract of the event store.
pub trait EventStore {
    /// Create the destination table if absent; never drops data.
    fn ensure_schema(&mut self) -> Result<(), StoreError>;

    /// Append one event as its own atomic unit and return the assigned id.
    fn append(&mut self, event: &NewEvent) -> Result<i64, StoreError>;

    /// All events in id order.
    fn events(&self) -> Result<Vec<FallbackEvent>, StoreError>;

    /// Number of stored events.
    fn count(&self) -> Result<usize, StoreError>;

    /// Delete every event, returning how many were removed.
    fn truncate(&mut self) -> Result<usize, StoreError>;

    /// Release the store, surfacing any error on close.
    fn close(self) -> Result<(), StoreError>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// SQLite-backed store.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl EventStore for SqliteStore {
    fn ensure_schema(&mut self) -> Result<(), StoreError> {
        self.conn.execute(CREATE_TABLE_SQL, [])?;
        Ok(())
    }

    fn append(&mut self, event: &NewEvent) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO fallback_events (timestamp, reasons, fallback_active, crc)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                event.timestamp,
                event.reasons,
                event.fallback_active,
                event.crc
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn events(&self) -> Result<Vec<FallbackEvent>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, reasons, fallback_active, crc
             FROM fallback_events ORDER BY id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<i64>>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp, reasons, fallback_active, crc) = row?;
            match (timestamp, reasons, fallback_active, crc) {
                (Some(timestamp), Some(reasons), Some(fallback_active), Some(crc)) => {
                    events.push(FallbackEvent {
                        id,
                        timestamp,
                        reasons,
                        fallback_active,
                        crc,
                    })
                }
                _ => {
                    return Err(StoreError::Corrupt {
                        id,
                        reason: "NULL column".to_string(),
                    })
                }
            }
        }
        Ok(events)
    }

    fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM fallback_events", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn truncate(&mut self) -> Result<usize, StoreError> {
        Ok(self.conn.execute("DELETE FROM fallback_events", [])?)
    }

    fn close(self) -> Result<(), StoreError> {
        self.conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }
}

/// In-memory store
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    events: Vec<FallbackEvent>,
    last_id: i64,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable access, used to simulate on-disk corruption in tests
    pub fn events_mut(&mut self) -> &mut Vec<FallbackEvent> {
        &mut self.events
    }
}

impl EventStore for MemoryStore {
    fn ensure_schema(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    fn append(&mut self, event: &NewEvent) -> Result<i64, StoreError> {
        // Ids keep growing across truncation, like AUTOINCREMENT.
        self.last_id += 1;
        self.events
            .push(FallbackEvent::from_new(self.last_id, event.clone()));
        Ok(self.last_id)
    }

    fn events(&self) -> Result<Vec<FallbackEvent>, StoreError> {
        Ok(self.events.clone())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.events.len())
    }

    fn truncate(&mut self) -> Result<usize, StoreError> {
        let removed = self.events.len();
        self.events.clear();
        Ok(removed)
    }
}
