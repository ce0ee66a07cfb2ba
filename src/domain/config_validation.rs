//! Configuration validation.
//!
//! Validates all config fields before the engine is built. Missing optional
//! keys take their defaults and are therefore valid.

use crate::domain::error::ForecastError;
use crate::domain::features::MIN_WINDOW;
use crate::domain::price_series::{Interval, Period};
use crate::ports::config_port::ConfigPort;

pub const MEMORY_BACKENDS: &[&str] = &["json", "sqlite"];

pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<(), ForecastError> {
    validate_data(config)?;
    validate_windows(config)?;
    validate_training(config)?;
    validate_analysis(config)?;
    validate_memory(config)?;
    validate_backtest(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> ForecastError {
    ForecastError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn require_min(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
    min: i64,
) -> Result<(), ForecastError> {
    let value = config.get_int(section, key, default);
    if value < min {
        return Err(invalid(section, key, format!("{key} must be at least {min}")));
    }
    Ok(())
}

fn require_positive(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<(), ForecastError> {
    let value = config.get_double(section, key, default);
    if !(value > 0.0) || !value.is_finite() {
        return Err(invalid(section, key, format!("{key} must be positive")));
    }
    Ok(())
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), ForecastError> {
    match config.get_string("data", "path") {
        Some(s) if !s.trim().is_empty() => {}
        _ => {
            return Err(ForecastError::ConfigMissing {
                section: "data".to_string(),
                key: "path".to_string(),
            });
        }
    }
    validate_period(config, "data")?;
    if let Some(interval) = config.get_string("data", "interval") {
        interval
            .parse::<Interval>()
            .map_err(|e| invalid("data", "interval", e.to_string()))?;
    }
    Ok(())
}

fn validate_period(config: &dyn ConfigPort, section: &str) -> Result<(), ForecastError> {
    if let Some(period) = config.get_string(section, "period") {
        period
            .parse::<Period>()
            .map_err(|e| invalid(section, "period", e.to_string()))?;
    }
    Ok(())
}

fn validate_windows(config: &dyn ConfigPort) -> Result<(), ForecastError> {
    require_min(config, "model", "short_window", 10, MIN_WINDOW as i64)?;
    require_min(config, "model", "long_window", 50, MIN_WINDOW as i64)?;
    Ok(())
}

fn validate_training(config: &dyn ConfigPort) -> Result<(), ForecastError> {
    require_positive(config, "model", "learning_rate", 0.5)?;
    require_min(config, "model", "epochs", 2000, 1)?;

    let l2 = config.get_double("model", "l2", 0.0);
    if l2 < 0.0 {
        return Err(invalid("model", "l2", "l2 must be non-negative"));
    }
    let tolerance = config.get_double("model", "tolerance", 1e-9);
    if tolerance < 0.0 {
        return Err(invalid("model", "tolerance", "tolerance must be non-negative"));
    }
    Ok(())
}

fn validate_analysis(config: &dyn ConfigPort) -> Result<(), ForecastError> {
    require_positive(config, "analysis", "error_threshold", 5.0)?;
    require_min(config, "analysis", "short_horizon", 10, 1)?;
    require_min(config, "analysis", "long_horizon", 50, 1)?;
    require_min(config, "analysis", "validation_span", 50, 1)?;
    require_min(config, "analysis", "cv_splits", 3, 1)?;
    require_min(config, "analysis", "ensemble_models", 3, 1)?;
    Ok(())
}

fn validate_memory(config: &dyn ConfigPort) -> Result<(), ForecastError> {
    let backend = config
        .get_string("memory", "backend")
        .unwrap_or_else(|| "json".to_string())
        .to_lowercase();
    if !MEMORY_BACKENDS.contains(&backend.as_str()) {
        return Err(invalid(
            "memory",
            "backend",
            format!("unknown backend {backend:?}, expected json or sqlite"),
        ));
    }
    if backend == "sqlite" && !cfg!(feature = "sqlite") {
        return Err(invalid("memory", "backend", "built without the sqlite feature"));
    }
    require_min(config, "memory", "lookback", 20, 1)?;
    Ok(())
}

fn validate_backtest(config: &dyn ConfigPort) -> Result<(), ForecastError> {
    validate_period(config, "backtest")?;
    require_min(config, "backtest", "validation_span", 50, 1)?;
    require_positive(config, "backtest", "threshold", 5.0)?;
    require_min(config, "backtest", "sample_size", 10, 1)?;
    Ok(())
}
