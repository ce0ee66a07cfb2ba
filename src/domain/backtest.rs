//! Backtest and retrain trigger.
//!
//! The trailing `validation_span` closes are held out; short and long window
//! models trained on the prefix forecast the span step by step, and each
//! window's mean absolute error is compared against `threshold`. The
//! resulting flag is a decision only: retraining is the separate
//! [`retrain`] call.

use crate::domain::error::ForecastError;
use crate::domain::forecast::forecast_path;
use crate::domain::memory::PredictionMemory;
use crate::domain::metrics::mean_absolute_error;
use crate::domain::model::{Regressor, TrainedModel};
use crate::domain::price_series::PriceSeries;
use crate::domain::trainer::Trainer;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub short_window: usize,
    pub long_window: usize,
    pub validation_span: usize,
    pub threshold: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            short_window: 10,
            long_window: 50,
            validation_span: 50,
            threshold: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub short_error: f64,
    pub long_error: f64,
    pub retrain: bool,
}

/// Scores both windows' forecasts against the actual validation values.
pub fn evaluate(
    symbol: &str,
    actual: &[f64],
    short_predictions: &[f64],
    long_predictions: &[f64],
    threshold: f64,
) -> Result<BacktestResult, ForecastError> {
    let mismatch = || {
        ForecastError::invalid_parameter(
            "predictions",
            format!(
                "expected {} values, got short={} long={}",
                actual.len(),
                short_predictions.len(),
                long_predictions.len()
            ),
        )
    };
    let short_error = mean_absolute_error(actual, short_predictions).ok_or_else(mismatch)?;
    let long_error = mean_absolute_error(actual, long_predictions).ok_or_else(mismatch)?;
    Ok(BacktestResult {
        symbol: symbol.to_string(),
        short_error,
        long_error,
        retrain: short_error > threshold || long_error > threshold,
    })
}

/// Replays held-out history through already-trained models.
pub fn replay(
    symbol: &str,
    prefix: &[f64],
    actual: &[f64],
    short_model: &dyn Regressor,
    long_model: &dyn Regressor,
    threshold: f64,
) -> Result<BacktestResult, ForecastError> {
    let need = short_model.window().max(long_model.window());
    if prefix.len() < need {
        return Err(ForecastError::InsufficientData {
            symbol: symbol.to_string(),
            have: prefix.len(),
            need,
        });
    }
    let short_predictions = forecast_path(short_model, prefix, actual.len());
    let long_predictions = forecast_path(long_model, prefix, actual.len());
    evaluate(symbol, actual, &short_predictions, &long_predictions, threshold)
}

pub fn run_backtest(
    trainer: &Trainer,
    series: &PriceSeries,
    config: &BacktestConfig,
) -> Result<BacktestResult, ForecastError> {
    let symbol = series.symbol();
    let need = config.long_window.max(config.short_window) + 1 + config.validation_span;
    let (train, validation) = series
        .split_tail(config.validation_span)
        .ok_or_else(|| ForecastError::InsufficientData {
            symbol: symbol.to_string(),
            have: series.len(),
            need,
        })?;

    let short_model = trainer.train(symbol, &train, config.short_window)?;
    let long_model = trainer.train(symbol, &train, config.long_window)?;

    let result = replay(
        symbol,
        &train.closes(),
        &validation.closes(),
        &short_model,
        &long_model,
        config.threshold,
    )?;

    tracing::info!(
        symbol = %symbol,
        short_error = result.short_error,
        long_error = result.long_error,
        retrain = result.retrain,
        "backtest complete"
    );
    Ok(result)
}

#[derive(Debug, Clone)]
pub struct RetrainOutcome {
    pub short_model: TrainedModel,
    pub long_model: TrainedModel,
}

/// Follow-up for a flagged symbol: retrains both windows on the full series
/// and resets the symbol's memory correction.
pub fn retrain(
    trainer: &Trainer,
    memory: &PredictionMemory,
    series: &PriceSeries,
    config: &BacktestConfig,
) -> Result<RetrainOutcome, ForecastError> {
    let symbol = series.symbol();
    let short_model = trainer.train(symbol, series, config.short_window)?;
    let long_model = trainer.train(symbol, series, config.long_window)?;
    memory.reset(symbol);
    tracing::info!(symbol = %symbol, "retrained models and reset memory bias");
    Ok(RetrainOutcome {
        short_model,
        long_model,
    })
}
