//! Core domain types and forecasting logic.

pub mod analysis;
pub mod backtest;
pub mod config;
pub mod config_validation;
pub mod cross_validation;
pub mod ensemble;
pub mod error;
pub mod error_analysis;
pub mod features;
pub mod forecast;
pub mod memory;
pub mod metrics;
pub mod model;
pub mod price_series;
pub mod trainer;
pub mod watchlist;
