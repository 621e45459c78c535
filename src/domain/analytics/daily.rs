//! Calendar-day OHLC aggregation.
//!
//! Samples are bucketed by the date their timestamp falls on in a caller
//! supplied fixed UTC offset. The offset is part of the call, never read from
//! the host clock or locale.

use chrono::{FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::rate::RateSample;

/// Below this many samples a candlestick view is not drawn.
pub const MIN_DAILY_BAR_SAMPLES: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub samples: usize,
}

impl DailyBar {
    fn open_with(date: NaiveDate, rate: Decimal) -> Self {
        Self {
            date,
            open: rate,
            high: rate,
            low: rate,
            close: rate,
            samples: 1,
        }
    }

    fn absorb(&mut self, rate: Decimal) {
        self.high = self.high.max(rate);
        self.low = self.low.min(rate);
        self.close = rate;
        self.samples += 1;
    }
}

/// Group an ascending series into one bar per calendar day in `offset`.
///
/// Returns an empty vector when the series has fewer than
/// [`MIN_DAILY_BAR_SAMPLES`] samples.
pub fn daily_bars(series: &[RateSample], offset: FixedOffset) -> Vec<DailyBar> {
    if series.len() < MIN_DAILY_BAR_SAMPLES {
        return Vec::new();
    }

    let mut bars: Vec<DailyBar> = Vec::new();
    for sample in series {
        let date = sample.timestamp.with_timezone(&offset).date_naive();
        match bars.last_mut() {
            Some(bar) if bar.date == date => bar.absorb(sample.rate),
            _ => bars.push(DailyBar::open_with(date, sample.rate)),
        }
    }
    bars
}
