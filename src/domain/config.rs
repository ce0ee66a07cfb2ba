//! Engine configuration passed explicitly into the forecasting engine.

use crate::domain::backtest::BacktestConfig;
use crate::domain::memory::DEFAULT_LOOKBACK;
use crate::domain::price_series::{Interval, Period};
use crate::domain::trainer::TrainerConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub period: Period,
    pub interval: Interval,
    pub short_window: usize,
    pub long_window: usize,
    pub short_horizon: usize,
    pub long_horizon: usize,
    /// Held-out tail used by the hindsight check in analysis.
    pub validation_span: usize,
    pub error_threshold: f64,
    pub cv_splits: usize,
    pub ensemble_models: usize,
    pub volatility_lookback: usize,
    pub memory_lookback: usize,
    pub trainer: TrainerConfig,
    pub backtest: BacktestConfig,
    pub backtest_period: Period,
    pub backtest_sample_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            period: Period::from_days(365),
            interval: Interval::Daily,
            short_window: 10,
            long_window: 50,
            short_horizon: 10,
            long_horizon: 50,
            validation_span: 50,
            error_threshold: 5.0,
            cv_splits: 3,
            ensemble_models: 3,
            volatility_lookback: 10,
            memory_lookback: DEFAULT_LOOKBACK,
            trainer: TrainerConfig::default(),
            backtest: BacktestConfig::default(),
            backtest_period: Period::from_days(150),
            backtest_sample_size: 10,
        }
    }
}
