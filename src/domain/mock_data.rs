//! Synthetic UGX/USD samples for demos and empty databases.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::domain::rate::RateSample;

pub const MOCK_SOURCE: &str = "mock_api";

#[derive(Debug, Clone, PartialEq)]
pub struct MockParams {
    pub base_rate: Decimal,
    /// Uniform noise in `[-variation, variation)` around `base_rate`.
    pub variation: f64,
    pub spread: Decimal,
    pub hours: usize,
}

impl Default for MockParams {
    fn default() -> Self {
        Self {
            base_rate: Decimal::new(3800_00, 2),
            variation: 50.0,
            spread: Decimal::new(10_00, 2),
            hours: 30 * 24,
        }
    }
}

/// Hourly samples ending at `now`, returned in ascending order.
pub fn generate_mock_series<R: Rng + ?Sized>(
    params: &MockParams,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<RateSample> {
    let mut samples: Vec<RateSample> = (0..params.hours)
        .map(|i| {
            let noise = if params.variation > 0.0 {
                rng.gen_range(-params.variation..params.variation)
            } else {
                0.0
            };
            let rate = (params.base_rate + Decimal::from_f64(noise).unwrap_or_default()).round_dp(4);
            RateSample {
                rate,
                buy_rate: rate - params.spread,
                sell_rate: rate + params.spread,
                timestamp: now - Duration::hours(i as i64),
                source: MOCK_SOURCE.to_string(),
            }
        })
        .collect();
    samples.reverse();
    samples
}
