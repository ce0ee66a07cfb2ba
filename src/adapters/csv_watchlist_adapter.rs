//! Watchlist stored as a `symbol,category` CSV file.

use crate::domain::error::ForecastError;
use crate::domain::watchlist::{Watchlist, WatchlistEntry};
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct WatchlistRow {
    symbol: String,
    #[serde(default)]
    category: Option<String>,
}

pub struct CsvWatchlistAdapter {
    path: PathBuf,
}

impl CsvWatchlistAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn source_err(&self, e: impl std::fmt::Display) -> ForecastError {
        ForecastError::DataSource {
            reason: format!("watchlist {}: {}", self.path.display(), e),
        }
    }

    /// A missing file is an empty watchlist.
    pub fn load(&self) -> Result<Watchlist, ForecastError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Watchlist::default()),
            Err(e) => return Err(self.source_err(e)),
        };

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());
        let mut entries = Vec::new();
        for result in rdr.deserialize::<WatchlistRow>() {
            let row = result.map_err(|e| self.source_err(e))?;
            entries.push(WatchlistEntry::new(&row.symbol, row.category.as_deref()));
        }
        Watchlist::from_entries(entries).map_err(|e| self.source_err(e))
    }

    pub fn save(&self, watchlist: &Watchlist) -> Result<(), ForecastError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(&self.path).map_err(|e| self.source_err(e))?;
        if watchlist.is_empty() {
            writer
                .write_record(["symbol", "category"])
                .map_err(|e| self.source_err(e))?;
        }
        for entry in watchlist.entries() {
            writer.serialize(entry).map_err(|e| self.source_err(e))?;
        }
        writer.flush()?;
        Ok(())
    }
}
