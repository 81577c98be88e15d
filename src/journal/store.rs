//! Event Journal Store
//!
//! Persists every committed registry event to SQLite so the full mutation
//! history can be audited without replaying the in-memory engine.
//!
//! # Storage
//! One row per event:
//! - Batch hash and event kind (indexed lookup by hash)
//! - JSON payload of the event
//! - Wall-clock time the row was written

use crate::types::{BatchHash, RegistryEvent};
use serde::Serialize;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

/// Column list for `registry_events` queries.
const EVENT_COLUMNS: &str = "id, batch_hash, kind, payload, recorded_at";

/// A stored journal row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct JournalEntry {
    pub id: i64,
    pub batch_hash: String,
    pub kind: String,
    pub payload: String,
    pub recorded_at: i64,
}

impl JournalEntry {
    /// Decode the stored payload back into the event
    pub fn event(&self) -> serde_json::Result<RegistryEvent> {
        serde_json::from_str(&self.payload)
    }
}

/// Append-only event journal backed by SQLite
#[derive(Clone)]
pub struct EventJournal {
    pool: SqlitePool,
}

impl EventJournal {
    /// Connect to `url` and create the journal table if it is missing
    ///
    /// A single connection keeps writes ordered and makes `sqlite::memory:`
    /// usable (each in-memory connection is its own database).
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await?;
        let journal = Self { pool };
        journal.migrate().await?;
        Ok(journal)
    }

    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS registry_events (\
                id INTEGER PRIMARY KEY AUTOINCREMENT, \
                batch_hash TEXT NOT NULL, \
                kind TEXT NOT NULL, \
                payload TEXT NOT NULL, \
                recorded_at INTEGER NOT NULL\
             )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_registry_events_batch \
             ON registry_events (batch_hash)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Store one event and return its row id
    pub async fn append(&self, event: &RegistryEvent) -> anyhow::Result<i64> {
        let payload = serde_json::to_string(event)?;
        let result = sqlx::query(
            "INSERT INTO registry_events (batch_hash, kind, payload, recorded_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(hash_key(&event.hash()))
        .bind(event.kind())
        .bind(payload)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// All journal rows for one batch, oldest first
    pub async fn events_for(&self, hash: &BatchHash) -> Result<Vec<JournalEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {EVENT_COLUMNS} FROM registry_events WHERE batch_hash = ? ORDER BY id"
        );
        sqlx::query_as::<_, JournalEntry>(&query)
            .bind(hash_key(hash))
            .fetch_all(&self.pool)
            .await
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM registry_events")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Full lowercase hex with `0x` prefix
fn hash_key(hash: &BatchHash) -> String {
    format!("{:?}", hash)
}

/// Background task draining committed events into the journal
pub struct JournalWriter {
    journal: EventJournal,
    events: UnboundedReceiver<RegistryEvent>,
}

impl JournalWriter {
    pub fn new(journal: EventJournal, events: UnboundedReceiver<RegistryEvent>) -> Self {
        Self { journal, events }
    }

    /// Write events until every sender is dropped
    ///
    /// A failed write is logged and skipped; registry state is never rolled
    /// back because of the journal.
    pub async fn start(mut self) -> anyhow::Result<()> {
        info!("Event journal writer started");
        while let Some(event) = self.events.recv().await {
            if let Err(e) = self.journal.append(&event).await {
                warn!("Failed to journal {} for {:?}: {:?}", event.kind(), event.hash(), e);
            }
        }
        info!("Event journal writer stopped");
        Ok(())
    }
}
