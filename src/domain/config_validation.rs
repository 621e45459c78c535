//! Configuration validation.
//!
//! Checks every config value `serve` depends on before anything starts, and
//! turns the raw values into the explicit parameter structs the domain takes.

use chrono::FixedOffset;
use rust_decimal::Decimal;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::domain::analytics::{AnalyticsParams, DEFAULT_MA_WINDOW};
use crate::domain::error::FxError;
use crate::domain::mock_data::MockParams;
use crate::domain::timeframe::Timeframe;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:3000";
pub const DEFAULT_POLL_SECONDS: i64 = 60;
const MAX_MA_WINDOW: i64 = 1000;
const MAX_POOL_SIZE: u32 = 64;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), FxError> {
    validate_sqlite(config)?;
    validate_listen(config)?;
    analytics_params(config)?;
    default_timeframe(config)?;
    poll_interval_seconds(config)?;
    mock_params(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> FxError {
    FxError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_sqlite(config: &dyn ConfigPort) -> Result<(), FxError> {
    match config.get_string("sqlite", "path") {
        Some(p) if !p.trim().is_empty() => {}
        _ => {
            return Err(FxError::ConfigMissing {
                section: "sqlite".to_string(),
                key: "path".to_string(),
            });
        }
    }
    pool_size(config)?;
    Ok(())
}

/// `[sqlite] pool_size`, default 4.
pub fn pool_size(config: &dyn ConfigPort) -> Result<u32, FxError> {
    let raw = config.get_int("sqlite", "pool_size", 4);
    u32::try_from(raw)
        .ok()
        .filter(|n| (1..=MAX_POOL_SIZE).contains(n))
        .ok_or_else(|| {
            invalid(
                "sqlite",
                "pool_size",
                format!("pool_size must be between 1 and {MAX_POOL_SIZE}, got {raw}"),
            )
        })
}

pub fn listen_addr(config: &dyn ConfigPort) -> Result<SocketAddr, FxError> {
    let raw = config.get_string_or("web", "listen", DEFAULT_LISTEN);
    raw.parse()
        .map_err(|_| invalid("web", "listen", format!("'{raw}' is not a socket address")))
}

fn validate_listen(config: &dyn ConfigPort) -> Result<(), FxError> {
    listen_addr(config).map(|_| ())
}

/// Parse `+HH:MM`, `-HH:MM`, `Z` or `UTC`.
pub fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match raw.chars().next()? {
        '+' => (1, &raw[1..]),
        '-' => (-1, &raw[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let two_digits = |field: &str| field.len() == 2 && field.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(hours) || !two_digits(minutes) {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

pub fn analytics_params(config: &dyn ConfigPort) -> Result<AnalyticsParams, FxError> {
    let window = config.get_int("analytics", "ma_window", DEFAULT_MA_WINDOW as i64);
    if !(1..=MAX_MA_WINDOW).contains(&window) {
        return Err(invalid(
            "analytics",
            "ma_window",
            format!("ma_window must be between 1 and {MAX_MA_WINDOW}"),
        ));
    }

    let raw_offset = config.get_string_or("analytics", "utc_offset", "+00:00");
    let utc_offset = parse_utc_offset(&raw_offset).ok_or_else(|| {
        invalid(
            "analytics",
            "utc_offset",
            format!("'{raw_offset}' is not an offset like +03:00"),
        )
    })?;

    Ok(AnalyticsParams {
        ma_window: window as usize,
        utc_offset,
    })
}

/// Timeframe used when a request or command names none.
pub fn default_timeframe(config: &dyn ConfigPort) -> Result<Timeframe, FxError> {
    match config.get_string("analytics", "default_timeframe") {
        None => Ok(Timeframe::DEFAULT),
        Some(token) => Timeframe::try_parse(&token).ok_or_else(|| {
            invalid(
                "analytics",
                "default_timeframe",
                format!("'{token}' is not one of 1d, 7d, 30d, 90d, 1y"),
            )
        }),
    }
}

pub fn poll_interval_seconds(config: &dyn ConfigPort) -> Result<u64, FxError> {
    let secs = config.get_int("alerts", "poll_seconds", DEFAULT_POLL_SECONDS);
    if secs < 1 {
        return Err(invalid("alerts", "poll_seconds", "poll_seconds must be at least 1"));
    }
    Ok(secs as u64)
}

fn decimal_or(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: Decimal,
) -> Result<Decimal, FxError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => Decimal::from_str(raw.trim())
            .map_err(|_| invalid(section, key, format!("'{raw}' is not a decimal number"))),
    }
}

pub fn mock_params(config: &dyn ConfigPort) -> Result<MockParams, FxError> {
    let defaults = MockParams::default();

    let base_rate = decimal_or(config, "mock", "base_rate", defaults.base_rate)?;
    if base_rate <= Decimal::ZERO {
        return Err(invalid("mock", "base_rate", "base_rate must be positive"));
    }
    let spread = decimal_or(config, "mock", "spread", defaults.spread)?;
    if spread < Decimal::ZERO {
        return Err(invalid("mock", "spread", "spread must be non-negative"));
    }
    let variation = config.get_double("mock", "variation", defaults.variation);
    if !variation.is_finite() || variation < 0.0 {
        return Err(invalid("mock", "variation", "variation must be non-negative"));
    }
    // Generated rates must stay positive.
    if Decimal::from_f64_retain(variation).is_none_or(|v| v >= base_rate) {
        return Err(invalid(
            "mock",
            "variation",
            format!("variation must be less than base_rate ({base_rate})"),
        ));
    }
    let hours = config.get_int("mock", "hours", defaults.hours as i64);
    let hours = mock_hours(hours).ok_or_else(|| invalid("mock", "hours", "hours must be at least 1"))?;

    Ok(MockParams {
        base_rate,
        variation,
        spread,
        hours,
    })
}

/// Hours of mock history, which must be at least one.
pub fn mock_hours(hours: i64) -> Option<usize> {
    usize::try_from(hours).ok().filter(|h| *h >= 1)
}
