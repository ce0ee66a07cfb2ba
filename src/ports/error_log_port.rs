//! Error log sink port.

use crate::domain::error::ForecastError;
use crate::domain::error_analysis::ErrorEvent;

pub trait ErrorLogPort {
    fn append(&self, event: &ErrorEvent) -> Result<(), ForecastError>;
}
