//! Buy/sell spread per sample.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::rate::RateSample;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadPoint {
    pub timestamp: DateTime<Utc>,
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
    pub spread: Decimal,
}

pub fn spread_series(series: &[RateSample]) -> Vec<SpreadPoint> {
    series
        .iter()
        .map(|s| SpreadPoint {
            timestamp: s.timestamp,
            buy_rate: s.buy_rate,
            sell_rate: s.sell_rate,
            spread: s.spread(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn spread_per_sample() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let series = vec![
            RateSample {
                rate: dec!(3800),
                buy_rate: dec!(3790),
                sell_rate: dec!(3810),
                timestamp: ts,
                source: "mock_api".into(),
            },
            RateSample {
                rate: dec!(3801.5),
                buy_rate: dec!(3795.25),
                sell_rate: dec!(3806.75),
                timestamp: ts + chrono::Duration::hours(1),
                source: "mock_api".into(),
            },
        ];

        let spreads = spread_series(&series);
        assert_eq!(spreads.len(), 2);
        assert_eq!(spreads[0].spread, dec!(20));
        assert_eq!(spreads[1].spread, dec!(11.50));
        assert_eq!(spreads[1].timestamp, series[1].timestamp);
    }
}
