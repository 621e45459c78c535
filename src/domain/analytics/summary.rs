//! Headline statistics for a rate series.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use super::{mean, sample_stddev};
use crate::domain::error::FxError;
use crate::domain::rate::{rate_column, RateSample};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub current: Decimal,
    pub previous: Decimal,
    pub change: Decimal,
    pub change_percent: f64,
    pub high: Decimal,
    pub low: Decimal,
    pub avg: f64,
    pub stddev: f64,
    pub samples: usize,
}

/// Summarize a non-empty series.
///
/// A single-sample series reports itself as its own previous value, so
/// `change` and `change_percent` are both zero. A zero previous rate also
/// yields a zero `change_percent`.
pub fn summarize(series: &[RateSample]) -> Result<Summary, FxError> {
    let last = series.last().ok_or(FxError::EmptySeries)?;
    let current = last.rate;
    let previous = if series.len() >= 2 {
        series[series.len() - 2].rate
    } else {
        current
    };
    let change = current - previous;

    let change_percent = if previous.is_zero() {
        0.0
    } else {
        change
            .checked_div(previous)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .and_then(|pct| pct.to_f64())
            .unwrap_or(0.0)
    };

    let high = series.iter().map(|s| s.rate).max().unwrap_or(current);
    let low = series.iter().map(|s| s.rate).min().unwrap_or(current);

    let rates = rate_column(series);

    Ok(Summary {
        current,
        previous,
        change,
        change_percent,
        high,
        low,
        avg: mean(&rates),
        stddev: sample_stddev(&rates),
        samples: series.len(),
    })
}
