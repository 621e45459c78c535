//! Every analytics view over one series, packaged for presentation.

use chrono::{FixedOffset, Offset, Utc};
use serde::Serialize;

use super::{
    daily_bars, moving_average, percent_change, rolling_volatility, spread_series, summarize,
    DailyBar, SeriesPoint, SpreadPoint, Summary, DEFAULT_MA_WINDOW, MIN_DAILY_BAR_SAMPLES,
};
use crate::domain::rate::RateSample;

/// Parameters that would otherwise come from ambient configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyticsParams {
    pub ma_window: usize,
    pub utc_offset: FixedOffset,
}

impl Default for AnalyticsParams {
    fn default() -> Self {
        Self {
            ma_window: DEFAULT_MA_WINDOW,
            utc_offset: Utc.fix(),
        }
    }
}

/// A view that is either ready to draw or a placeholder with a reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Panel<T> {
    Ready { data: T },
    Insufficient { reason: String },
}

impl<T> Panel<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Panel::Ready { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Panel::Ready { data } => Some(data),
            Panel::Insufficient { .. } => None,
        }
    }

    fn insufficient(reason: impl Into<String>) -> Self {
        Panel::Insufficient {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub summary: Panel<Summary>,
    pub trend: Panel<Vec<SeriesPoint>>,
    pub moving_average: Panel<Vec<SeriesPoint>>,
    pub candlesticks: Panel<Vec<DailyBar>>,
    pub spread: Panel<Vec<SpreadPoint>>,
    pub volatility: Panel<Vec<SeriesPoint>>,
    pub percent_change: Panel<Vec<SeriesPoint>>,
}

const NO_DATA: &str = "no data available";

pub fn build_dashboard(series: &[RateSample], params: &AnalyticsParams) -> Dashboard {
    let summary = match summarize(series) {
        Ok(summary) => Panel::Ready { data: summary },
        Err(_) => return empty_dashboard(),
    };

    let trend = series
        .iter()
        .map(|s| SeriesPoint {
            timestamp: s.timestamp,
            value: Some(s.rate_f64()),
        })
        .collect();

    let bars = daily_bars(series, params.utc_offset);
    let candlesticks = if bars.is_empty() {
        Panel::insufficient(format!(
            "need at least {} samples, have {}",
            MIN_DAILY_BAR_SAMPLES,
            series.len()
        ))
    } else {
        Panel::Ready { data: bars }
    };

    let volatility = match rolling_volatility(series) {
        Ok(points) => Panel::Ready { data: points },
        Err(e) => Panel::insufficient(e.to_string()),
    };

    Dashboard {
        summary,
        trend: Panel::Ready { data: trend },
        moving_average: Panel::Ready {
            data: moving_average(series, params.ma_window),
        },
        candlesticks,
        spread: Panel::Ready {
            data: spread_series(series),
        },
        volatility,
        percent_change: Panel::Ready {
            data: percent_change(series),
        },
    }
}

fn empty_dashboard() -> Dashboard {
    Dashboard {
        summary: Panel::insufficient(NO_DATA),
        trend: Panel::insufficient(NO_DATA),
        moving_average: Panel::insufficient(NO_DATA),
        candlesticks: Panel::insufficient(NO_DATA),
        spread: Panel::insufficient(NO_DATA),
        volatility: Panel::insufficient(NO_DATA),
        percent_change: Panel::insufficient(NO_DATA),
    }
}
