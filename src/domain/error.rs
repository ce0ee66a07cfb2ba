//! Domain error types.

/// Top-level error type for pricecast.
#[derive(Debug, thiserror::Error)]
pub enum ForecastError {
    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {symbol}: have {have} prices, need {need}")]
    InsufficientData {
        symbol: String,
        have: usize,
        need: usize,
    },

    #[error("training failed for {symbol} (window {window}): {reason}")]
    TrainingFailed {
        symbol: String,
        window: usize,
        reason: String,
    },

    #[error("prediction memory unavailable: {reason}")]
    MemoryUnavailable { reason: String },

    #[error("model expects window {model}, got {requested}")]
    WindowMismatch { model: usize, requested: usize },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("out-of-order memory entry for {symbol}")]
    OutOfOrder { symbol: String },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ForecastError {
    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        ForecastError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Errors that only affect one symbol and must not abort a batch.
    pub fn is_per_symbol(&self) -> bool {
        matches!(
            self,
            ForecastError::NoData { .. }
                | ForecastError::InsufficientData { .. }
                | ForecastError::TrainingFailed { .. }
                | ForecastError::WindowMismatch { .. }
                | ForecastError::DataSource { .. }
        )
    }
}

impl From<&ForecastError> for std::process::ExitCode {
    fn from(err: &ForecastError) -> Self {
        let code: u8 = match err {
            ForecastError::Io(_) | ForecastError::Report { .. } => 1,
            ForecastError::ConfigParse { .. }
            | ForecastError::ConfigMissing { .. }
            | ForecastError::ConfigInvalid { .. }
            | ForecastError::InvalidParameter { .. } => 2,
            ForecastError::DataSource { .. }
            | ForecastError::MemoryUnavailable { .. }
            | ForecastError::OutOfOrder { .. } => 3,
            ForecastError::TrainingFailed { .. } | ForecastError::WindowMismatch { .. } => 4,
            ForecastError::NoData { .. } | ForecastError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_insufficient_data() {
        let err = ForecastError::InsufficientData {
            symbol: "AAPL".into(),
            have: 5,
            need: 11,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for AAPL: have 5 prices, need 11"
        );
    }

    #[test]
    fn per_symbol_classification() {
        assert!(ForecastError::NoData { symbol: "X".into() }.is_per_symbol());
        assert!(
            ForecastError::TrainingFailed {
                symbol: "X".into(),
                window: 10,
                reason: "nan".into()
            }
            .is_per_symbol()
        );
        assert!(
            !ForecastError::MemoryUnavailable {
                reason: "corrupt".into()
            }
            .is_per_symbol()
        );
    }
}
