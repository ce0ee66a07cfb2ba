//! Prediction memory: per-symbol history of past predictions and errors.
//!
//! Append-only. A forecast is stored as a pending entry tagged with the date
//! it targets; once a bar for that date arrives, a resolved observation is
//! appended. Correction is the mean signed error (`actual - predicted`) over
//! the most recent `lookback` resolved observations since the last reset
//! marker.

use crate::domain::error::ForecastError;
use crate::domain::price_series::PriceSeries;
use crate::ports::memory_port::MemoryStorePort;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

pub const DEFAULT_LOOKBACK: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    #[default]
    Observation,
    Pending,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub timestamp: DateTime<Utc>,
    pub predicted: f64,
    pub actual: Option<f64>,
    pub error: Option<f64>,
    #[serde(default)]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
}

impl MemoryEntry {
    pub fn observation(
        timestamp: DateTime<Utc>,
        predicted: f64,
        actual: Option<f64>,
        error: Option<f64>,
    ) -> Self {
        Self {
            timestamp,
            predicted,
            actual,
            error,
            kind: EntryKind::Observation,
            target_date: None,
        }
    }

    pub fn pending(timestamp: DateTime<Utc>, target_date: NaiveDate, predicted: f64) -> Self {
        Self {
            timestamp,
            predicted,
            actual: None,
            error: None,
            kind: EntryKind::Pending,
            target_date: Some(target_date),
        }
    }

    pub fn resolved(
        timestamp: DateTime<Utc>,
        target_date: NaiveDate,
        predicted: f64,
        actual: f64,
    ) -> Self {
        Self {
            timestamp,
            predicted,
            actual: Some(actual),
            error: Some(actual - predicted),
            kind: EntryKind::Observation,
            target_date: Some(target_date),
        }
    }

    pub fn reset(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            predicted: 0.0,
            actual: None,
            error: None,
            kind: EntryKind::Reset,
            target_date: None,
        }
    }
}

pub struct PredictionMemory {
    entries: Mutex<HashMap<String, Vec<MemoryEntry>>>,
    store: Option<Box<dyn MemoryStorePort>>,
    lookback: usize,
    degraded: AtomicBool,
}

impl PredictionMemory {
    /// Memory with no backing store.
    pub fn in_memory(lookback: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            store: None,
            lookback: lookback.max(1),
            degraded: AtomicBool::new(false),
        }
    }

    /// Loads from `store`; an unreadable store degrades to an empty memory.
    pub fn open(store: Box<dyn MemoryStorePort>, lookback: usize) -> Self {
        let (entries, degraded) = match store.load() {
            Ok(mut entries) => {
                for history in entries.values_mut() {
                    history.sort_by_key(|e| e.timestamp);
                }
                (entries, false)
            }
            Err(e) => {
                tracing::warn!(error = %e, "prediction memory unavailable, continuing with empty memory");
                (HashMap::new(), true)
            }
        };
        Self {
            entries: Mutex::new(entries),
            store: Some(store),
            lookback: lookback.max(1),
            degraded: AtomicBool::new(degraded),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<MemoryEntry>>> {
        // A poisoned lock still holds consistent append-only data.
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Mean signed error over the recent resolved history, if any.
    pub fn bias(&self, symbol: &str) -> Option<f64> {
        let entries = self.lock();
        let history = entries.get(symbol)?;
        let errors: Vec<f64> = since_reset(history)
            .iter()
            .rev()
            .filter(|e| e.kind == EntryKind::Observation)
            .filter_map(|e| e.error)
            .filter(|e| e.is_finite())
            .take(self.lookback)
            .collect();
        if errors.is_empty() {
            return None;
        }
        Some(errors.iter().sum::<f64>() / errors.len() as f64)
    }

    pub fn adjust(&self, symbol: &str, raw_prediction: f64) -> f64 {
        match self.bias(symbol) {
            Some(bias) => raw_prediction + bias,
            None => raw_prediction,
        }
    }

    /// Records an observation stamped now. The timestamp is clamped so a
    /// symbol's history never goes backwards.
    pub fn record(
        &self,
        symbol: &str,
        predicted: f64,
        actual: Option<f64>,
        error: Option<f64>,
    ) -> Result<MemoryEntry, ForecastError> {
        let mut entries = self.lock();
        let timestamp = next_timestamp(&entries, symbol);
        let entry = MemoryEntry::observation(timestamp, predicted, actual, error);
        self.append_locked(&mut entries, symbol, entry.clone());
        Ok(entry)
    }

    /// Records an observation with an explicit timestamp; earlier than the
    /// symbol's latest entry is rejected.
    pub fn record_at(
        &self,
        symbol: &str,
        timestamp: DateTime<Utc>,
        predicted: f64,
        actual: Option<f64>,
        error: Option<f64>,
    ) -> Result<MemoryEntry, ForecastError> {
        let mut entries = self.lock();
        if let Some(last) = entries.get(symbol).and_then(|h| h.last()) {
            if timestamp < last.timestamp {
                return Err(ForecastError::OutOfOrder {
                    symbol: symbol.to_string(),
                });
            }
        }
        let entry = MemoryEntry::observation(timestamp, predicted, actual, error);
        self.append_locked(&mut entries, symbol, entry.clone());
        Ok(entry)
    }

    /// Appends a reset marker; corrections restart from an empty history.
    pub fn reset(&self, symbol: &str) -> MemoryEntry {
        let mut entries = self.lock();
        let timestamp = next_timestamp(&entries, symbol);
        let entry = MemoryEntry::reset(timestamp);
        self.append_locked(&mut entries, symbol, entry.clone());
        entry
    }

    /// Stores a forecast for `target_date`. Returns `None` without appending
    /// when that date already has a forecast since the last reset.
    pub fn record_pending(
        &self,
        symbol: &str,
        target_date: NaiveDate,
        predicted: f64,
    ) -> Result<Option<MemoryEntry>, ForecastError> {
        if !predicted.is_finite() {
            return Err(ForecastError::invalid_parameter(
                "predicted",
                format!("non-finite forecast for {symbol}"),
            ));
        }
        let mut entries = self.lock();
        let seen = entries.get(symbol).is_some_and(|h| {
            since_reset(h)
                .iter()
                .any(|e| e.target_date == Some(target_date))
        });
        if seen {
            return Ok(None);
        }
        let timestamp = next_timestamp(&entries, symbol);
        let entry = MemoryEntry::pending(timestamp, target_date, predicted);
        self.append_locked(&mut entries, symbol, entry.clone());
        Ok(Some(entry))
    }

    /// Resolves pending forecasts against `series`: the first bar on or after
    /// a target date supplies the actual. The target must fall inside the
    /// series, after its first bar. Pending entries from before the last
    /// reset are never resolved. Returns the appended observations.
    pub fn resolve(&self, symbol: &str, series: &PriceSeries) -> Vec<MemoryEntry> {
        let bars = series.bars();
        let mut entries = self.lock();
        let Some(history) = entries.get(symbol) else {
            return Vec::new();
        };
        let recent = since_reset(history);
        let open: Vec<(NaiveDate, f64)> = recent
            .iter()
            .filter(|e| e.kind == EntryKind::Pending)
            .filter_map(|e| e.target_date.map(|d| (d, e.predicted)))
            .filter(|(d, _)| {
                !recent
                    .iter()
                    .any(|r| r.kind == EntryKind::Observation && r.target_date == Some(*d))
            })
            .collect();

        let mut resolved = Vec::new();
        for (target, predicted) in open {
            let idx = bars.partition_point(|b| b.date < target);
            if idx == 0 || idx >= bars.len() {
                continue;
            }
            let timestamp = next_timestamp(&entries, symbol);
            let entry = MemoryEntry::resolved(timestamp, target, predicted, bars[idx].close);
            self.append_locked(&mut entries, symbol, entry.clone());
            resolved.push(entry);
        }
        resolved
    }

    fn append_locked(
        &self,
        entries: &mut HashMap<String, Vec<MemoryEntry>>,
        symbol: &str,
        entry: MemoryEntry,
    ) {
        if let Some(store) = &self.store {
            if let Err(e) = store.append(symbol, &entry) {
                tracing::warn!(symbol = %symbol, error = %e, "failed to persist memory entry");
                self.degraded.store(true, Ordering::Relaxed);
            }
        }
        entries.entry(symbol.to_string()).or_default().push(entry);
    }

    pub fn training_count(&self, symbol: &str) -> usize {
        self.lock()
            .get(symbol)
            .map(|h| h.iter().filter(|e| e.kind == EntryKind::Observation).count())
            .unwrap_or(0)
    }

    pub fn history(&self, symbol: &str) -> Vec<MemoryEntry> {
        self.lock().get(symbol).cloned().unwrap_or_default()
    }
}

fn since_reset(history: &[MemoryEntry]) -> &[MemoryEntry] {
    match history.iter().rposition(|e| e.kind == EntryKind::Reset) {
        Some(i) => &history[i + 1..],
        None => history,
    }
}

/// Now, clamped so a symbol's history never goes backwards.
fn next_timestamp(entries: &HashMap<String, Vec<MemoryEntry>>, symbol: &str) -> DateTime<Utc> {
    let now = Utc::now();
    entries
        .get(symbol)
        .and_then(|h| h.last())
        .map_or(now, |last| last.timestamp.max(now))
}
