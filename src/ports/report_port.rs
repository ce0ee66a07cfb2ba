//! Report sink port.

use crate::domain::analysis::ReportRecord;
use crate::domain::backtest::BacktestResult;
use crate::domain::error::ForecastError;

/// Accepts structured per-symbol records; rendering and delivery are the
/// sink's concern.
pub trait ReportPort {
    fn write_reports(&self, records: &[ReportRecord]) -> Result<(), ForecastError>;

    fn write_backtest(&self, results: &[BacktestResult]) -> Result<(), ForecastError>;
}
