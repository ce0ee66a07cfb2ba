//! Ensemble aggregation: mean of several models differing only by seed.

use crate::domain::error::ForecastError;
use crate::domain::forecast::predict_next;
use crate::domain::price_series::PriceSeries;
use crate::domain::trainer::Trainer;

/// Member forecasts for seeds `seed, seed + 1, ..`.
pub fn ensemble_predictions(
    trainer: &Trainer,
    symbol: &str,
    series: &PriceSeries,
    window: usize,
    n_models: usize,
) -> Result<Vec<f64>, ForecastError> {
    if n_models == 0 {
        return Err(ForecastError::invalid_parameter("n_models", "must be at least 1"));
    }
    let base_seed = trainer.config().seed;
    (0..n_models as u64)
        .map(|i| {
            let model = trainer.train_with_seed(symbol, series, window, base_seed.wrapping_add(i))?;
            predict_next(&model, series, window)
        })
        .collect()
}

pub fn ensemble_predict(
    trainer: &Trainer,
    symbol: &str,
    series: &PriceSeries,
    window: usize,
    n_models: usize,
) -> Result<f64, ForecastError> {
    let members = ensemble_predictions(trainer, symbol, series, window, n_models)?;
    Ok(members.iter().sum::<f64>() / members.len() as f64)
}
