//! Market data access port.

use crate::domain::error::ForecastError;
use crate::domain::price_series::{Interval, Period, PriceSeries};

pub trait MarketDataPort {
    /// Price history for `symbol` covering the trailing `period`. An empty
    /// series is a valid answer.
    fn get_series(
        &self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceSeries, ForecastError>;
}
