//! One-step and iterated multi-step forecasting.
//!
//! Multi-step forecasts feed each prediction back into the trailing window
//! (drop oldest, append newest), so error accumulates with the horizon.

use crate::domain::error::ForecastError;
use crate::domain::model::Regressor;
use crate::domain::price_series::PriceSeries;
use std::collections::VecDeque;

fn seed_window(
    model: &dyn Regressor,
    series: &PriceSeries,
    window: usize,
) -> Result<Vec<f64>, ForecastError> {
    if window != model.window() {
        return Err(ForecastError::WindowMismatch {
            model: model.window(),
            requested: window,
        });
    }
    let closes = series.closes();
    if closes.len() < window {
        return Err(ForecastError::InsufficientData {
            symbol: series.symbol().to_string(),
            have: closes.len(),
            need: window,
        });
    }
    Ok(closes[closes.len() - window..].to_vec())
}

pub fn predict_next(
    model: &dyn Regressor,
    series: &PriceSeries,
    window: usize,
) -> Result<f64, ForecastError> {
    let input = seed_window(model, series, window)?;
    Ok(model.predict(&input))
}

pub fn predict_horizon(
    model: &dyn Regressor,
    series: &PriceSeries,
    horizon: usize,
    window: usize,
) -> Result<f64, ForecastError> {
    if horizon == 0 {
        return Err(ForecastError::invalid_parameter("horizon", "must be at least 1"));
    }
    let input = seed_window(model, series, window)?;
    let path = forecast_path(model, &input, horizon);
    path.last()
        .copied()
        .ok_or_else(|| ForecastError::invalid_parameter("horizon", "must be at least 1"))
}

/// Every intermediate step of an iterated forecast seeded with `seed`.
///
/// `seed` must hold at least `model.window()` values; only the trailing
/// window is used.
pub fn forecast_path(model: &dyn Regressor, seed: &[f64], steps: usize) -> Vec<f64> {
    let window = model.window();
    let start = seed.len().saturating_sub(window);
    let mut current: VecDeque<f64> = seed[start..].iter().copied().collect();
    let mut path = Vec::with_capacity(steps);

    for _ in 0..steps {
        let next = model.predict(current.make_contiguous());
        path.push(next);
        current.pop_front();
        current.push_back(next);
    }

    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    /// Predicts last value + 1.
    struct StepModel {
        window: usize,
    }

    impl Regressor for StepModel {
        fn window(&self) -> usize {
            self.window
        }
        fn predict(&self, input: &[f64]) -> f64 {
            input[input.len() - 1] + 1.0
        }
    }

    /// Predicts the mean of the window.
    struct MeanModel;

    impl Regressor for MeanModel {
        fn window(&self) -> usize {
            3
        }
        fn predict(&self, input: &[f64]) -> f64 {
            input.iter().sum::<f64>() / input.len() as f64
        }
    }

    fn series(closes: &[f64]) -> PriceSeries {
        PriceSeries::from_closes("X", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), closes)
    }

    #[test]
    fn predict_next_uses_trailing_window() {
        let s = series(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(predict_next(&MeanModel, &s, 3).unwrap(), 4.0);
    }

    #[test]
    fn horizon_one_equals_next() {
        let s = series(&[3.0, 1.0, 4.0, 1.0, 5.0, 9.0]);
        let next = predict_next(&MeanModel, &s, 3).unwrap();
        let h1 = predict_horizon(&MeanModel, &s, 1, 3).unwrap();
        assert_eq!(next, h1);
    }

    #[test]
    fn horizon_feeds_predictions_back() {
        let s = series(&[1.0, 2.0, 3.0]);
        let model = StepModel { window: 2 };
        assert_eq!(predict_horizon(&model, &s, 5, 2).unwrap(), 8.0);
    }

    #[test]
    fn mean_model_feedback_is_exact() {
        // [1,2,3] -> 2; [2,3,2] -> 7/3; [3,2,7/3] -> 22/9
        let s = series(&[1.0, 2.0, 3.0]);
        let h3 = predict_horizon(&MeanModel, &s, 3, 3).unwrap();
        assert!((h3 - 22.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn path_records_every_step() {
        let model = StepModel { window: 2 };
        let path = forecast_path(&model, &[10.0, 11.0, 12.0], 4);
        assert_eq!(path, vec![13.0, 14.0, 15.0, 16.0]);
    }

    #[test]
    fn path_is_restartable() {
        let seed = [5.0, 7.0, 6.0];
        assert_eq!(
            forecast_path(&MeanModel, &seed, 10),
            forecast_path(&MeanModel, &seed, 10)
        );
    }

    #[test]
    fn window_mismatch_is_rejected() {
        let s = series(&[1.0, 2.0, 3.0, 4.0]);
        assert!(matches!(
            predict_next(&MeanModel, &s, 2),
            Err(ForecastError::WindowMismatch { model: 3, requested: 2 })
        ));
    }

    #[test]
    fn short_series_is_rejected() {
        let s = series(&[1.0, 2.0]);
        assert!(matches!(
            predict_next(&MeanModel, &s, 3),
            Err(ForecastError::InsufficientData { .. })
        ));
    }

    #[test]
    fn zero_horizon_is_rejected() {
        let s = series(&[1.0, 2.0, 3.0]);
        assert!(matches!(
            predict_horizon(&MeanModel, &s, 0, 3),
            Err(ForecastError::InvalidParameter { .. })
        ));
    }
}
