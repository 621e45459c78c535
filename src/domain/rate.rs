//! Exchange-rate sample representation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// One UGX/USD observation.
///
/// `buy_rate < rate < sell_rate` is expected but not checked; analytics
/// tolerate samples that break it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSample {
    pub rate: Decimal,
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

impl RateSample {
    /// sell_rate - buy_rate
    pub fn spread(&self) -> Decimal {
        self.sell_rate - self.buy_rate
    }

    /// The mid rate as a float, for statistics that need `sqrt`.
    pub fn rate_f64(&self) -> f64 {
        self.rate.to_f64().unwrap_or(0.0)
    }
}

/// Float view of the rate column.
pub fn rate_column(series: &[RateSample]) -> Vec<f64> {
    series.iter().map(RateSample::rate_f64).collect()
}
