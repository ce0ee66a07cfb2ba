//! Daily price bars and the ordered series built from them.

use crate::domain::error::ForecastError;
use chrono::{Days, NaiveDate};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Price history for one symbol, ascending by date with no duplicate dates.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Sorts `bars` by date; duplicate dates are rejected.
    pub fn new(symbol: impl Into<String>, mut bars: Vec<PriceBar>) -> Result<Self, ForecastError> {
        let symbol = symbol.into();
        bars.sort_by_key(|b| b.date);
        if let Some(pair) = bars.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(ForecastError::DataSource {
                reason: format!("duplicate date {} in series for {}", pair[0].date, symbol),
            });
        }
        Ok(Self { symbol, bars })
    }

    /// Synthetic daily series with one bar per close, starting at `start`.
    pub fn from_closes(symbol: impl Into<String>, start: NaiveDate, closes: &[f64]) -> Self {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 0,
            })
            .collect();
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Splits off the trailing `tail` bars.
    pub fn split_tail(&self, tail: usize) -> Option<(PriceSeries, PriceSeries)> {
        if tail == 0 || tail >= self.bars.len() {
            return None;
        }
        let cut = self.bars.len() - tail;
        Some((
            PriceSeries {
                symbol: self.symbol.clone(),
                bars: self.bars[..cut].to_vec(),
            },
            PriceSeries {
                symbol: self.symbol.clone(),
                bars: self.bars[cut..].to_vec(),
            },
        ))
    }

    /// Keeps the bars within `period` of the last bar's date. A period
    /// reaching past the calendar keeps the whole series.
    pub fn trailing(&self, period: Period) -> PriceSeries {
        let Some(last) = self.last_date() else {
            return self.clone();
        };
        let Some(cutoff) = last.checked_sub_days(Days::new(u64::from(period.days()))) else {
            return self.clone();
        };
        PriceSeries {
            symbol: self.symbol.clone(),
            bars: self.bars.iter().filter(|b| b.date > cutoff).cloned().collect(),
        }
    }
}

/// Longest accepted look-back, one hundred years.
pub const MAX_PERIOD_DAYS: u32 = 36_500;

/// Look-back span requested from a market data provider, e.g. `150d`, `1y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    days: u32,
}

impl Period {
    pub fn days(self) -> u32 {
        self.days
    }

    pub fn from_days(days: u32) -> Self {
        Self { days }
    }
}

impl FromStr for Period {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| ForecastError::invalid_parameter("period", format!("missing unit in {s:?}")))?;
        let (num, unit) = s.split_at(split);
        let n: u32 = num
            .parse()
            .map_err(|_| ForecastError::invalid_parameter("period", format!("invalid count in {s:?}")))?;
        let per_unit = match unit {
            "d" => 1,
            "w" => 7,
            "mo" => 30,
            "y" => 365,
            _ => {
                return Err(ForecastError::invalid_parameter(
                    "period",
                    format!("unknown unit {unit:?}"),
                ));
            }
        };
        if n == 0 {
            return Err(ForecastError::invalid_parameter("period", "must be positive"));
        }
        match n.checked_mul(per_unit) {
            Some(days) if days <= MAX_PERIOD_DAYS => Ok(Period { days }),
            _ => Err(ForecastError::invalid_parameter(
                "period",
                format!("{s:?} exceeds {MAX_PERIOD_DAYS} days"),
            )),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.days)
    }
}

/// Bar granularity. Only daily bars are modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Daily,
}

impl FromStr for Interval {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1d" => Ok(Interval::Daily),
            other => Err(ForecastError::invalid_parameter(
                "interval",
                format!("unsupported interval {other:?}"),
            )),
        }
    }
}
