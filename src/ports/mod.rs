//! Port traits implemented by adapters.

pub mod alert_port;
pub mod config_port;
pub mod rate_port;
