//! Append-only CSV error log.

use crate::domain::error::ForecastError;
use crate::domain::error_analysis::ErrorEvent;
use crate::ports::error_log_port::ErrorLogPort;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

pub struct CsvErrorLogAdapter {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvErrorLogAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    fn io_err(&self, e: impl std::fmt::Display) -> ForecastError {
        ForecastError::Report {
            reason: format!("error log {}: {}", self.path.display(), e),
        }
    }
}

impl ErrorLogPort for CsvErrorLogAdapter {
    fn append(&self, event: &ErrorEvent) -> Result<(), ForecastError> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;
        let needs_header = file.metadata().map_err(|e| self.io_err(e))?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(event).map_err(|e| self.io_err(e))?;
        writer.flush().map_err(|e| self.io_err(e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn event(symbol: &str, actual: f64, predicted: f64) -> ErrorEvent {
        ErrorEvent {
            timestamp: Utc.with_ymd_and_hms(2024, 6, 3, 9, 30, 0).unwrap(),
            category: "Tech".into(),
            symbol: symbol.into(),
            horizon_label: "10-day".into(),
            actual,
            predicted,
            reason: "10-day forecast error too large".into(),
        }
    }

    #[test]
    fn header_written_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("error_log.csv");
        let log = CsvErrorLogAdapter::new(path.clone());

        log.append(&event("AAPL", 180.0, 170.0)).unwrap();
        log.append(&event("MSFT", 400.0, 390.5)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "timestamp,category,symbol,horizon_label,actual,predicted,reason"
        );
        assert!(lines[1].contains(",Tech,AAPL,10-day,180.0,170.0,"));
        assert!(lines[2].contains(",MSFT,"));
    }

    #[test]
    fn reopening_appends_without_new_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("error_log.csv");
        CsvErrorLogAdapter::new(path.clone())
            .append(&event("A", 1.0, 10.0))
            .unwrap();
        CsvErrorLogAdapter::new(path.clone())
            .append(&event("B", 2.0, 20.0))
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("timestamp,category").count(), 1);
        assert_eq!(content.lines().count(), 3);
    }
}
