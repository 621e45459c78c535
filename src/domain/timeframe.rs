//! Timeframe tokens used to select a trailing range of samples.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Timeframe {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
    #[serde(rename = "90d")]
    NinetyDays,
    #[serde(rename = "1y")]
    OneYear,
}

impl Timeframe {
    pub const DEFAULT: Timeframe = Timeframe::ThirtyDays;

    /// Parse a token. Unknown tokens fall back to [`Timeframe::DEFAULT`].
    pub fn parse(token: &str) -> Self {
        Self::try_parse(token).unwrap_or(Self::DEFAULT)
    }

    /// Strict variant of [`Timeframe::parse`], used for config validation.
    pub fn try_parse(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "1d" => Some(Timeframe::OneDay),
            "7d" => Some(Timeframe::SevenDays),
            "30d" => Some(Timeframe::ThirtyDays),
            "90d" => Some(Timeframe::NinetyDays),
            "1y" => Some(Timeframe::OneYear),
            _ => None,
        }
    }

    pub fn days(self) -> i64 {
        match self {
            Timeframe::OneDay => 1,
            Timeframe::SevenDays => 7,
            Timeframe::ThirtyDays => 30,
            Timeframe::NinetyDays => 90,
            Timeframe::OneYear => 365,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::days(self.days())
    }

    /// `(now - duration, now)`
    pub fn range(self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now - self.duration(), now)
    }

    pub fn token(self) -> &'static str {
        match self {
            Timeframe::OneDay => "1d",
            Timeframe::SevenDays => "7d",
            Timeframe::ThirtyDays => "30d",
            Timeframe::NinetyDays => "90d",
            Timeframe::OneYear => "1y",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
