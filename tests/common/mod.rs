#![allow(dead_code)]

use chrono::NaiveDate;
use pricecast::domain::analysis::ReportRecord;
use pricecast::domain::backtest::BacktestResult;
use pricecast::domain::error::ForecastError;
use pricecast::domain::error_analysis::ErrorEvent;
use pricecast::domain::price_series::{Interval, Period, PriceSeries};
use pricecast::ports::data_port::MarketDataPort;
use pricecast::ports::error_log_port::ErrorLogPort;
use pricecast::ports::news_port::{NewsPort, NewsSignal};
use pricecast::ports::report_port::ReportPort;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::process::ExitCode;

pub struct MockMarketData {
    pub data: HashMap<String, Vec<f64>>,
    pub errors: HashMap<String, String>,
    pub requests: RefCell<Vec<(String, Period)>>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn with_closes(mut self, symbol: &str, closes: Vec<f64>) -> Self {
        self.data.insert(symbol.to_string(), closes);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl MarketDataPort for MockMarketData {
    fn get_series(
        &self,
        symbol: &str,
        period: Period,
        _interval: Interval,
    ) -> Result<PriceSeries, ForecastError> {
        self.requests
            .borrow_mut()
            .push((symbol.to_string(), period));
        if let Some(reason) = self.errors.get(symbol) {
            return Err(ForecastError::DataSource {
                reason: reason.clone(),
            });
        }
        let closes = self.data.get(symbol).cloned().unwrap_or_default();
        Ok(PriceSeries::from_closes(symbol, date(2023, 1, 2), &closes))
    }
}

pub struct MockNews {
    pub signals: HashMap<String, NewsSignal>,
}

impl MockNews {
    pub fn quiet() -> Self {
        Self {
            signals: HashMap::new(),
        }
    }

    pub fn with_signal(mut self, symbol: &str, signal: NewsSignal) -> Self {
        self.signals.insert(symbol.to_string(), signal);
        self
    }
}

impl NewsPort for MockNews {
    fn signal(&self, symbol: &str) -> Result<NewsSignal, ForecastError> {
        Ok(self.signals.get(symbol).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MockErrorLog {
    pub events: RefCell<Vec<ErrorEvent>>,
}

impl ErrorLogPort for MockErrorLog {
    fn append(&self, event: &ErrorEvent) -> Result<(), ForecastError> {
        self.events.borrow_mut().push(event.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MockReport {
    pub reports: RefCell<Vec<ReportRecord>>,
    pub backtests: RefCell<Vec<BacktestResult>>,
}

impl ReportPort for MockReport {
    fn write_reports(&self, records: &[ReportRecord]) -> Result<(), ForecastError> {
        self.reports.borrow_mut().extend_from_slice(records);
        Ok(())
    }

    fn write_backtest(&self, results: &[BacktestResult]) -> Result<(), ForecastError> {
        self.backtests.borrow_mut().extend_from_slice(results);
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `start, start + 1, ...`
pub fn linear_closes(count: usize, start: f64) -> Vec<f64> {
    (0..count).map(|i| start + i as f64).collect()
}

/// Deterministic zig-zag around a slow trend.
pub fn noisy_closes(count: usize, start: f64) -> Vec<f64> {
    (0..count)
        .map(|i| start + 0.3 * i as f64 + if i % 2 == 0 { 1.5 } else { -1.5 })
        .collect()
}

/// Writes `<dir>/<SYMBOL>.csv` with one daily bar per close.
pub fn write_price_csv(dir: &Path, symbol: &str, start: NaiveDate, closes: &[f64]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    for (i, close) in closes.iter().enumerate() {
        let day = start + chrono::Duration::days(i as i64);
        content.push_str(&format!(
            "{},{},{},{},{},1000\n",
            day.format("%Y-%m-%d"),
            close,
            close + 1.0,
            close - 1.0,
            close
        ));
    }
    std::fs::write(dir.join(format!("{symbol}.csv")), content).unwrap();
}

pub fn is_success(code: ExitCode) -> bool {
    format!("{code:?}") == format!("{:?}", ExitCode::SUCCESS)
}

pub fn exit_code_is(code: ExitCode, expected: u8) -> bool {
    format!("{code:?}") == format!("{:?}", ExitCode::from(expected))
}
