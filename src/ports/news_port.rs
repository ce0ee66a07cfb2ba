//! News/sentiment provider port.

use crate::domain::error::ForecastError;

/// Headlines and sentiment for a symbol, consumed as an opaque numeric signal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewsSignal {
    pub headlines: Vec<String>,
    /// Aggregate sentiment in [-1, 1].
    pub sentiment: f64,
    /// Largest-magnitude headline polarity.
    pub max_polarity: f64,
}

impl NewsSignal {
    pub fn neutral() -> Self {
        Self::default()
    }
}

pub trait NewsPort {
    fn signal(&self, symbol: &str) -> Result<NewsSignal, ForecastError>;
}
