//! News provider that never has headlines.

use crate::domain::error::ForecastError;
use crate::ports::news_port::{NewsPort, NewsSignal};

#[derive(Debug, Default, Clone, Copy)]
pub struct NullNewsAdapter;

impl NewsPort for NullNewsAdapter {
    fn signal(&self, _symbol: &str) -> Result<NewsSignal, ForecastError> {
        Ok(NewsSignal::neutral())
    }
}
