//! CSV report sink for analysis records and backtest results.

use crate::domain::analysis::ReportRecord;
use crate::domain::backtest::BacktestResult;
use crate::domain::error::ForecastError;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvReportAdapter {
    report_path: PathBuf,
    backtest_path: PathBuf,
}

impl CsvReportAdapter {
    pub fn new(report_path: PathBuf, backtest_path: PathBuf) -> Self {
        Self {
            report_path,
            backtest_path,
        }
    }
}

fn report_err(path: &Path, e: impl std::fmt::Display) -> ForecastError {
    ForecastError::Report {
        reason: format!("{}: {}", path.display(), e),
    }
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), ForecastError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| report_err(path, e))?;
    }
    let mut writer = csv::Writer::from_path(path).map_err(|e| report_err(path, e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| report_err(path, e))?;
    }
    writer.flush().map_err(|e| report_err(path, e))?;
    tracing::info!(path = %path.display(), rows = rows.len(), "report written");
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write_reports(&self, records: &[ReportRecord]) -> Result<(), ForecastError> {
        write_rows(&self.report_path, records)
    }

    fn write_backtest(&self, results: &[BacktestResult]) -> Result<(), ForecastError> {
        write_rows(&self.backtest_path, results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::watchlist::WatchlistEntry;
    use tempfile::TempDir;

    #[test]
    fn writes_skipped_record_with_empty_fields() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvReportAdapter::new(
            dir.path().join("report.csv"),
            dir.path().join("backtest.csv"),
        );
        let entry = WatchlistEntry::new("XYZ", Some("Misc"));
        let record = ReportRecord::skipped(
            &entry,
            &ForecastError::NoData {
                symbol: "XYZ".into(),
            },
        );

        adapter.write_reports(&[record]).unwrap();

        let content = fs::read_to_string(dir.path().join("report.csv")).unwrap();
        let mut lines = content.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("symbol,category,status,last_date,last_close"));
        assert!(header.ends_with(
            "training_count,short_actual,short_error,short_reason,\
             long_actual,long_error,long_reason,news_headlines,explanation"
        ));
        assert_eq!(
            lines.next().unwrap(),
            format!("XYZ,Misc,skipped{}no data for XYZ", ",".repeat(20))
        );
    }

    #[test]
    fn writes_hindsight_columns_and_headlines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.csv");
        let adapter = CsvReportAdapter::new(path.clone(), dir.path().join("backtest.csv"));
        let mut record = ReportRecord::skipped(
            &WatchlistEntry::new("ABC", Some("Tech")),
            &ForecastError::NoData {
                symbol: "ABC".into(),
            },
        );
        record.status = crate::domain::analysis::ReportStatus::Analyzed;
        record.short_actual = Some(170.0);
        record.short_error = Some(0.25);
        record.short_reason = Some("10-day forecast within tolerance.".into());
        record.long_actual = Some(174.0);
        record.long_error = Some(6.5);
        record.long_reason = Some("50-day forecast error too large".into());
        record.news_headlines = Some("Beat estimates | New plant, shares up".into());
        record.explanation = "ok".into();

        adapter.write_reports(&[record]).unwrap();

        let content = fs::read_to_string(path).unwrap();
        let row = content.lines().nth(1).unwrap();
        assert_eq!(
            row,
            format!(
                "ABC,Tech,analyzed{}170.0,0.25,10-day forecast within tolerance.,\
                 174.0,6.5,50-day forecast error too large,\
                 \"Beat estimates | New plant, shares up\",ok",
                ",".repeat(13)
            )
        );
    }

    #[test]
    fn writes_backtest_results() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("backtest.csv");
        let adapter = CsvReportAdapter::new(dir.path().join("report.csv"), path.clone());
        let results = vec![
            BacktestResult {
                symbol: "AAA".into(),
                short_error: 0.5,
                long_error: 1.25,
                retrain: false,
            },
            BacktestResult {
                symbol: "BBB".into(),
                short_error: 6.0,
                long_error: 6.0,
                retrain: true,
            },
        ];

        adapter.write_backtest(&results).unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert_eq!(
            content,
            "symbol,short_error,long_error,retrain\nAAA,0.5,1.25,false\nBBB,6.0,6.0,true\n"
        );
    }

    #[test]
    fn unwritable_path_is_report_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let adapter = CsvReportAdapter::new(blocker.join("report.csv"), blocker.join("b.csv"));
        let err = adapter.write_reports(&[]).unwrap_err();
        assert!(matches!(err, ForecastError::Report { .. }));
    }
}
