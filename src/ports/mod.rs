//! Port traits implemented by adapters.

pub mod config_port;
pub mod data_port;
pub mod error_log_port;
pub mod memory_port;
pub mod news_port;
pub mod report_port;
