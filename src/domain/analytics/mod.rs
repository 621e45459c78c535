//! Analytics over a rate series.
//!
//! Every function here takes the series by shared slice and returns freshly
//! built values, so one fetched series can feed all derived views at once:
//! - [`summary`]: current/previous/change and descriptive statistics
//! - [`daily`]: calendar-day OHLC bars
//! - [`rolling`]: moving average, rolling volatility, percent change
//! - [`spread`]: buy/sell spread per sample
//! - [`dashboard`]: all of the above bundled for presentation

pub mod daily;
pub mod dashboard;
pub mod rolling;
pub mod spread;
pub mod summary;

pub use daily::{daily_bars, DailyBar, MIN_DAILY_BAR_SAMPLES};
pub use dashboard::{build_dashboard, AnalyticsParams, Dashboard, Panel};
pub use rolling::{
    moving_average, percent_change, rolling_volatility, volatility_window, DEFAULT_MA_WINDOW,
    MIN_VOLATILITY_SAMPLES,
};
pub use spread::{spread_series, SpreadPoint};
pub use summary::{summarize, Summary};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A value aligned to a sample timestamp. `None` marks a position without
/// enough history; it serializes as `null` and must not be drawn as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample (n-1) standard deviation; 0 for fewer than two values.
pub(crate) fn sample_stddev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let sum_sq: f64 = values
        .iter()
        .map(|v| {
            let diff = v - avg;
            diff * diff
        })
        .sum();
    (sum_sq / (n - 1) as f64).sqrt()
}
