//! CSV file market data adapter.
//!
//! One file per symbol, `<dir>/<SYMBOL>.csv`, with the header
//! `date,open,high,low,close,volume`.

use crate::domain::error::ForecastError;
use crate::domain::price_series::{Interval, Period, PriceBar, PriceSeries};
use crate::ports::data_port::MarketDataPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct PriceRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: i64,
}

pub struct CsvPriceAdapter {
    base_path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol.to_uppercase()))
    }
}

impl MarketDataPort for CsvPriceAdapter {
    fn get_series(
        &self,
        symbol: &str,
        period: Period,
        _interval: Interval,
    ) -> Result<PriceSeries, ForecastError> {
        // Files hold daily bars only.
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| ForecastError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();
        for result in rdr.deserialize::<PriceRow>() {
            let row = result.map_err(|e| ForecastError::DataSource {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;
            let date = NaiveDate::parse_from_str(row.date.trim(), "%Y-%m-%d").map_err(|e| {
                ForecastError::DataSource {
                    reason: format!("invalid date {:?}: {}", row.date, e),
                }
            })?;
            bars.push(PriceBar {
                date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        let series = PriceSeries::new(symbol.to_uppercase(), bars)?;
        Ok(series.trailing(period))
    }
}
