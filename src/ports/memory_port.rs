//! Persistent prediction-memory store port.

use crate::domain::error::ForecastError;
use crate::domain::memory::MemoryEntry;
use std::collections::HashMap;

/// Symbol-keyed append/read persistence for prediction memory.
///
/// Implementations must tolerate concurrent `load` calls and serialise
/// `append`.
pub trait MemoryStorePort: Send + Sync {
    fn load(&self) -> Result<HashMap<String, Vec<MemoryEntry>>, ForecastError>;

    fn append(&self, symbol: &str, entry: &MemoryEntry) -> Result<(), ForecastError>;
}
