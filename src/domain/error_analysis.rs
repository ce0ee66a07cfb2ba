//! Significance scoring for individual prediction errors.
//!
//! The boolean decision is `error > threshold` only. Volatility and news
//! factors weight the score and shape the explanation.

use crate::domain::metrics::{simple_returns, std_dev};
use crate::ports::news_port::NewsSignal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Polarity magnitude above which a headline is treated as unreliable.
pub const EXTREME_POLARITY: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Horizon {
    Short(usize),
    Long(usize),
}

impl Horizon {
    pub fn label(&self) -> String {
        match self {
            Horizon::Short(days) | Horizon::Long(days) => format!("{days}-day"),
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorAssessment {
    pub error: f64,
    pub weighted_score: f64,
    pub is_significant: bool,
    pub explanation: String,
}

pub fn score(
    horizon: Horizon,
    actual: f64,
    predicted: f64,
    threshold: f64,
    volatility_factor: f64,
    news_factor: f64,
) -> ErrorAssessment {
    let error = (actual - predicted).abs();
    let is_significant = error > threshold;
    let weighted_score = error * volatility_factor * news_factor;

    let explanation = if is_significant {
        let cause = match horizon {
            Horizon::Short(_) => "likely driven by short-term market volatility",
            Horizon::Long(_) => "likely driven by long-term trend drift and data lag",
        };
        let mut text = format!(
            "{} forecast error too large (error={:.2}), {}",
            horizon.label(),
            error,
            cause
        );
        if volatility_factor > 1.0 {
            text.push_str(&format!("; volatility elevated (x{volatility_factor:.2})"));
        }
        if news_factor > 1.0 {
            text.push_str("; recent news looks unreliable");
        }
        text.push('.');
        text
    } else {
        format!("{} forecast within tolerance.", horizon.label())
    };

    ErrorAssessment {
        error,
        weighted_score,
        is_significant,
        explanation,
    }
}

/// Ratio of recent to overall return dispersion; 1.0 when undefined.
pub fn volatility_factor(closes: &[f64], recent: usize) -> f64 {
    let returns = simple_returns(closes);
    if recent < 2 || returns.len() <= recent {
        return 1.0;
    }
    let overall = std_dev(&returns).unwrap_or(0.0);
    let latest = std_dev(&returns[returns.len() - recent..]).unwrap_or(0.0);
    if overall > 0.0 && latest.is_finite() {
        latest / overall
    } else {
        1.0
    }
}

pub fn news_factor(signal: &NewsSignal) -> f64 {
    if signal.max_polarity.abs() > EXTREME_POLARITY {
        2.0
    } else {
        1.0
    }
}

/// A significant misprediction, appended to the error log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEvent {
    pub timestamp: DateTime<Utc>,
    pub category: String,
    pub symbol: String,
    pub horizon_label: String,
    pub actual: f64,
    pub predicted: f64,
    pub reason: String,
}
