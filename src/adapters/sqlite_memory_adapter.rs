//! SQLite prediction memory store.

use crate::domain::error::ForecastError;
use crate::domain::memory::{EntryKind, MemoryEntry};
use crate::ports::config_port::ConfigPort;
use crate::ports::memory_port::MemoryStorePort;
use chrono::{DateTime, NaiveDate, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::collections::HashMap;

pub struct SqliteMemoryAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn unavailable(e: impl std::fmt::Display) -> ForecastError {
    ForecastError::MemoryUnavailable {
        reason: e.to_string(),
    }
}

fn kind_to_str(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Observation => "observation",
        EntryKind::Pending => "pending",
        EntryKind::Reset => "reset",
    }
}

fn kind_from_str(s: &str) -> Result<EntryKind, ForecastError> {
    match s {
        "observation" => Ok(EntryKind::Observation),
        "pending" => Ok(EntryKind::Pending),
        "reset" => Ok(EntryKind::Reset),
        other => Err(unavailable(format!("unknown entry kind {other:?}"))),
    }
}

impl SqliteMemoryAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ForecastError> {
        let db_path = config
            .get_string("memory", "path")
            .ok_or_else(|| ForecastError::ConfigMissing {
                section: "memory".into(),
                key: "path".into(),
            })?;

        let pool_size = config.get_int("memory", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| unavailable(e))?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, ForecastError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| unavailable(e))?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), ForecastError> {
        let conn = self.pool.get().map_err(|e: r2d2::Error| unavailable(e))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS prediction_memory (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                predicted REAL NOT NULL,
                actual REAL,
                error REAL,
                kind TEXT NOT NULL DEFAULT 'observation',
                target_date TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_prediction_memory_symbol
                ON prediction_memory(symbol);",
        )
        .map_err(|e: rusqlite::Error| unavailable(e))?;

        Ok(())
    }
}

impl MemoryStorePort for SqliteMemoryAdapter {
    fn load(&self) -> Result<HashMap<String, Vec<MemoryEntry>>, ForecastError> {
        let conn = self.pool.get().map_err(|e: r2d2::Error| unavailable(e))?;

        let mut stmt = conn
            .prepare(
                "SELECT symbol, timestamp, predicted, actual, error, kind, target_date
                 FROM prediction_memory ORDER BY id",
            )
            .map_err(|e: rusqlite::Error| unavailable(e))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, Option<String>>(6)?,
                ))
            })
            .map_err(|e: rusqlite::Error| unavailable(e))?;

        let mut entries: HashMap<String, Vec<MemoryEntry>> = HashMap::new();
        for row in rows {
            let (symbol, ts, predicted, actual, error, kind, target) =
                row.map_err(|e: rusqlite::Error| unavailable(e))?;
            let timestamp = DateTime::parse_from_rfc3339(&ts)
                .map_err(|e| unavailable(format!("invalid timestamp {ts:?}: {e}")))?
                .with_timezone(&Utc);
            let target_date = target
                .map(|d| {
                    NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                        .map_err(|e| unavailable(format!("invalid target date {d:?}: {e}")))
                })
                .transpose()?;
            entries.entry(symbol).or_default().push(MemoryEntry {
                timestamp,
                predicted,
                actual,
                error,
                kind: kind_from_str(&kind)?,
                target_date,
            });
        }
        Ok(entries)
    }

    fn append(&self, symbol: &str, entry: &MemoryEntry) -> Result<(), ForecastError> {
        let conn = self.pool.get().map_err(|e: r2d2::Error| unavailable(e))?;

        conn.execute(
            "INSERT INTO prediction_memory
                 (symbol, timestamp, predicted, actual, error, kind, target_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                symbol,
                entry.timestamp.to_rfc3339(),
                entry.predicted,
                entry.actual,
                entry.error,
                kind_to_str(entry.kind),
                entry.target_date.map(|d| d.format("%Y-%m-%d").to_string()),
            ],
        )
        .map_err(|e: rusqlite::Error| unavailable(e))?;

        Ok(())
    }
}
