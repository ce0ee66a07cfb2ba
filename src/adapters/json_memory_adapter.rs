//! Prediction memory persisted as a single JSON document.
//!
//! Layout: `{"SYMBOL": [entry, ...], ...}`. Every append rewrites the file
//! through a temporary sibling and an atomic rename.

use crate::domain::error::ForecastError;
use crate::domain::memory::MemoryEntry;
use crate::ports::memory_port::MemoryStorePort;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

type Document = HashMap<String, Vec<MemoryEntry>>;

pub struct JsonMemoryAdapter {
    path: PathBuf,
    // Last persisted document; None until first loaded.
    cache: Mutex<Option<Document>>,
}

impl JsonMemoryAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    fn unavailable(&self, what: &str, err: impl std::fmt::Display) -> ForecastError {
        ForecastError::MemoryUnavailable {
            reason: format!("{what} {}: {err}", self.path.display()),
        }
    }

    fn read_document(&self) -> Result<Document, ForecastError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => return Err(self.unavailable("failed to read", e)),
        };
        if content.trim().is_empty() {
            return Ok(Document::new());
        }
        serde_json::from_str(&content).map_err(|e| self.unavailable("corrupt memory file", e))
    }

    fn write_document(&self, doc: &Document) -> Result<(), ForecastError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.unavailable("failed to create dir for", e))?;
        }
        let json =
            serde_json::to_string_pretty(doc).map_err(|e| self.unavailable("failed to encode", e))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.unavailable("failed to write", e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.unavailable("failed to replace", e))?;
        Ok(())
    }
}

impl MemoryStorePort for JsonMemoryAdapter {
    fn load(&self) -> Result<HashMap<String, Vec<MemoryEntry>>, ForecastError> {
        let doc = self.read_document()?;
        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        *cache = Some(doc.clone());
        Ok(doc)
    }

    fn append(&self, symbol: &str, entry: &MemoryEntry) -> Result<(), ForecastError> {
        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        let mut doc = match cache.take() {
            Some(doc) => doc,
            None => self.read_document()?,
        };
        doc.entry(symbol.to_string()).or_default().push(entry.clone());
        let written = self.write_document(&doc);
        *cache = Some(doc);
        written
    }
}
