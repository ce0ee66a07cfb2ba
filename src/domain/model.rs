//! Trained forecasting model and the regression seam used by forecasters.

use chrono::{DateTime, Utc};

/// Anything that maps a fixed-width window of prices to the next price.
pub trait Regressor {
    fn window(&self) -> usize;
    fn predict(&self, input: &[f64]) -> f64;
}

/// z-score scaling fitted on training closes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaler {
    pub mean: f64,
    pub std: f64,
}

impl Scaler {
    /// Zero-variance data falls back to unit scale.
    pub fn fit(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self { mean: 0.0, std: 1.0 };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        let std = if variance > 1e-12 { variance.sqrt() } else { 1.0 };
        Self { mean, std }
    }

    pub fn scale(&self, value: f64) -> f64 {
        (value - self.mean) / self.std
    }

    pub fn unscale(&self, value: f64) -> f64 {
        value * self.std + self.mean
    }
}

/// Linear autoregression over scaled prices, tagged with what it was trained for.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub symbol: String,
    pub window: usize,
    pub trained_at: DateTime<Utc>,
    pub seed: u64,
    pub weights: Vec<f64>,
    pub bias: f64,
    pub scaler: Scaler,
    pub epochs_run: usize,
}

impl Regressor for TrainedModel {
    fn window(&self) -> usize {
        self.window
    }

    fn predict(&self, input: &[f64]) -> f64 {
        let scaled: f64 = self
            .weights
            .iter()
            .zip(input)
            .map(|(w, x)| w * self.scaler.scale(*x))
            .sum();
        self.scaler.unscale(scaled + self.bias)
    }
}
