//! Model trainer: fits a linear autoregression by full-batch gradient descent.
//!
//! Inputs and targets are z-scored with a scaler fitted on the training
//! closes. Weights start uniform in [-INIT_RANGE, INIT_RANGE] from a seeded
//! RNG, the bias starts at zero. The step size is `learning_rate / window`
//! so wide windows (strongly correlated inputs) stay stable.

use crate::domain::error::ForecastError;
use crate::domain::features::{self, Sample};
use crate::domain::model::{Scaler, TrainedModel};
use crate::domain::price_series::PriceSeries;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const INIT_RANGE: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainerConfig {
    pub learning_rate: f64,
    pub epochs: usize,
    pub l2: f64,
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.5,
            epochs: 2000,
            l2: 0.0,
            tolerance: 1e-9,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn train(
        &self,
        symbol: &str,
        series: &PriceSeries,
        window: usize,
    ) -> Result<TrainedModel, ForecastError> {
        self.train_closes(symbol, &series.closes(), window, self.config.seed)
    }

    pub fn train_with_seed(
        &self,
        symbol: &str,
        series: &PriceSeries,
        window: usize,
        seed: u64,
    ) -> Result<TrainedModel, ForecastError> {
        self.train_closes(symbol, &series.closes(), window, seed)
    }

    pub fn train_closes(
        &self,
        symbol: &str,
        closes: &[f64],
        window: usize,
        seed: u64,
    ) -> Result<TrainedModel, ForecastError> {
        let failed = |reason: String| ForecastError::TrainingFailed {
            symbol: symbol.to_string(),
            window,
            reason,
        };

        let samples = features::prepare(symbol, closes, window).map_err(|e| failed(e.to_string()))?;
        if closes.iter().any(|c| !c.is_finite()) {
            return Err(failed("non-finite price in training data".into()));
        }

        let scaler = Scaler::fit(closes);
        let scaled: Vec<Sample> = samples
            .iter()
            .map(|s| Sample {
                input: s.input.iter().map(|v| scaler.scale(*v)).collect(),
                target: scaler.scale(s.target),
            })
            .collect();

        let mut rng = StdRng::seed_from_u64(seed);
        let mut weights: Vec<f64> = (0..window)
            .map(|_| rng.gen_range(-INIT_RANGE..=INIT_RANGE))
            .collect();
        let mut bias = 0.0_f64;

        let step = self.config.learning_rate / window as f64;
        let n = scaled.len() as f64;
        let mut epochs_run = 0;

        for _ in 0..self.config.epochs {
            epochs_run += 1;
            let mut grad_w = vec![0.0_f64; window];
            let mut grad_b = 0.0_f64;

            for sample in &scaled {
                let pred: f64 = weights
                    .iter()
                    .zip(&sample.input)
                    .map(|(w, x)| w * x)
                    .sum::<f64>()
                    + bias;
                let err = pred - sample.target;
                for (g, x) in grad_w.iter_mut().zip(&sample.input) {
                    *g += err * x;
                }
                grad_b += err;
            }

            let mut norm_sq = 0.0;
            for (g, w) in grad_w.iter_mut().zip(&weights) {
                *g = *g / n + self.config.l2 * w;
                norm_sq += *g * *g;
            }
            grad_b /= n;
            norm_sq += grad_b * grad_b;

            if !norm_sq.is_finite() {
                return Err(failed(format!("gradient diverged after {epochs_run} epochs")));
            }

            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= step * g;
            }
            bias -= step * grad_b;

            if norm_sq.sqrt() < self.config.tolerance {
                break;
            }
        }

        if weights.iter().any(|w| !w.is_finite()) || !bias.is_finite() {
            return Err(failed("non-finite model parameters".into()));
        }

        tracing::debug!(
            symbol = %symbol,
            window,
            seed,
            epochs = epochs_run,
            "model trained"
        );

        Ok(TrainedModel {
            symbol: symbol.to_string(),
            window,
            trained_at: Utc::now(),
            seed,
            weights,
            bias,
            scaler,
            epochs_run,
        })
    }
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new(TrainerConfig::default())
    }
}
