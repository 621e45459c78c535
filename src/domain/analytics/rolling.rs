//! Rolling-window series: moving average, volatility, percent change.
//!
//! Each output has one point per input sample, aligned by timestamp.
//! Warmup: the first (window - 1) points carry no value.

use super::{mean, sample_stddev, SeriesPoint};
use crate::domain::error::FxError;
use crate::domain::rate::{rate_column, RateSample};

pub const DEFAULT_MA_WINDOW: usize = 7;

/// Rolling volatility is only reported for series at least this long.
pub const MIN_VOLATILITY_SAMPLES: usize = 10;

const MAX_VOLATILITY_WINDOW: usize = 7;

fn rolling<F>(series: &[RateSample], window: usize, stat: F) -> Vec<SeriesPoint>
where
    F: Fn(&[f64]) -> f64,
{
    let rates = rate_column(series);
    let warmup = window.saturating_sub(1);

    series
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            let value = if window > 0 && i >= warmup {
                Some(stat(&rates[i + 1 - window..=i]))
            } else {
                None
            };
            SeriesPoint {
                timestamp: sample.timestamp,
                value,
            }
        })
        .collect()
}

/// Simple moving average of the rate over `window` samples.
pub fn moving_average(series: &[RateSample], window: usize) -> Vec<SeriesPoint> {
    rolling(series, window, mean)
}

/// min(7, len / 2)
pub fn volatility_window(len: usize) -> usize {
    MAX_VOLATILITY_WINDOW.min(len / 2)
}

/// Rolling sample standard deviation of the rate.
pub fn rolling_volatility(series: &[RateSample]) -> Result<Vec<SeriesPoint>, FxError> {
    if series.len() < MIN_VOLATILITY_SAMPLES {
        return Err(FxError::InsufficientData {
            view: "volatility",
            have: series.len(),
            minimum: MIN_VOLATILITY_SAMPLES,
        });
    }
    Ok(rolling(series, volatility_window(series.len()), sample_stddev))
}

/// Period-over-period percentage change of the rate.
pub fn percent_change(series: &[RateSample]) -> Vec<SeriesPoint> {
    let rates = rate_column(series);

    series
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            let value = match i.checked_sub(1).map(|p| rates[p]) {
                Some(prev) if prev != 0.0 => Some((rates[i] - prev) / prev * 100.0),
                _ => None,
            };
            SeriesPoint {
                timestamp: sample.timestamp,
                value,
            }
        })
        .collect()
}
