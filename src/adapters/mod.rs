//! Concrete adapter implementations for ports.

pub mod csv_error_log_adapter;
pub mod csv_price_adapter;
pub mod csv_report_adapter;
pub mod csv_watchlist_adapter;
pub mod file_config_adapter;
pub mod json_memory_adapter;
pub mod null_news_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_memory_adapter;
