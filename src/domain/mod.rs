//! Core domain types and logic.

pub mod alert;
pub mod analytics;
pub mod config_validation;
pub mod error;
pub mod mock_data;
pub mod monitor;
pub mod rate;
pub mod timeframe;
