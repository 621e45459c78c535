//! Threshold alert rules and their evaluation.
//!
//! A rule is either active or inactive; deactivation is one-way. Evaluation
//! is a pure comparison. Recording is edge-triggered: [`scan_crossings`]
//! reports every sample at which the rate newly crossed the threshold, and
//! the alert store rejects a second event for the same rule and sample
//! timestamp.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::FxError;
use crate::domain::rate::RateSample;

const MAX_OWNER_LEN: usize = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Above,
    Below,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Above => "above",
            Direction::Below => "below",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "above" => Ok(Direction::Above),
            "below" => Ok(Direction::Below),
            other => Err(FxError::InvalidRule {
                reason: format!("unknown direction '{other}', expected 'above' or 'below'"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRule {
    pub id: i64,
    pub owner: String,
    pub threshold_rate: Decimal,
    pub direction: Direction,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    /// Timestamp of the newest sample the monitor has evaluated this rule against.
    pub last_checked_at: Option<DateTime<Utc>>,
}

/// A validated request to create a rule.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlertRule {
    pub owner: String,
    pub threshold_rate: Decimal,
    pub direction: Direction,
}

impl NewAlertRule {
    pub fn new(owner: &str, threshold_rate: Decimal, direction: &str) -> Result<Self, FxError> {
        let owner = validate_owner(owner)?;
        validate_threshold(threshold_rate)?;
        Ok(Self {
            owner,
            threshold_rate,
            direction: direction.parse()?,
        })
    }
}

/// Explicit edit of an existing rule. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleUpdate {
    pub threshold_rate: Option<Decimal>,
    pub direction: Option<Direction>,
}

impl RuleUpdate {
    pub fn validate(&self) -> Result<(), FxError> {
        if let Some(threshold) = self.threshold_rate {
            validate_threshold(threshold)?;
        }
        Ok(())
    }

    pub fn apply(&self, rule: &AlertRule) -> AlertRule {
        AlertRule {
            threshold_rate: self.threshold_rate.unwrap_or(rule.threshold_rate),
            direction: self.direction.unwrap_or(rule.direction),
            ..rule.clone()
        }
    }
}

fn validate_owner(owner: &str) -> Result<String, FxError> {
    let owner = owner.trim();
    if owner.is_empty() {
        return Err(FxError::InvalidRule {
            reason: "owner must not be empty".into(),
        });
    }
    if owner.len() > MAX_OWNER_LEN {
        return Err(FxError::InvalidRule {
            reason: format!("owner must be at most {MAX_OWNER_LEN} characters"),
        });
    }
    Ok(owner.to_string())
}

fn validate_threshold(threshold: Decimal) -> Result<(), FxError> {
    if threshold <= Decimal::ZERO {
        return Err(FxError::InvalidRule {
            reason: format!("threshold_rate must be positive, got {threshold}"),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub rule_id: i64,
    pub triggered_rate: Decimal,
    pub triggered_at: DateTime<Utc>,
}

impl AlertRule {
    /// Whether `rate` is strictly beyond the threshold. Inactive rules never fire.
    pub fn evaluate(&self, rate: Decimal) -> bool {
        if !self.active {
            return false;
        }
        match self.direction {
            Direction::Above => rate > self.threshold_rate,
            Direction::Below => rate < self.threshold_rate,
        }
    }

    /// active -> inactive; no-op on an inactive rule.
    pub fn deactivated(&self) -> AlertRule {
        AlertRule {
            active: false,
            ..self.clone()
        }
    }
}

pub fn evaluate(rule: &AlertRule, rate: Decimal) -> bool {
    rule.evaluate(rate)
}

/// Events for every crossing edge in `samples` (ascending).
///
/// `was_crossed` is the rule's state just before the first sample. A rule
/// stays quiet while the rate remains beyond the threshold and re-arms once
/// it returns to the other side.
pub fn scan_crossings(
    rule: &AlertRule,
    was_crossed: bool,
    samples: &[RateSample],
) -> Vec<AlertEvent> {
    let mut crossed = was_crossed;
    let mut events = Vec::new();
    for sample in samples {
        let now = rule.evaluate(sample.rate);
        if now && !crossed {
            events.push(AlertEvent {
                rule_id: rule.id,
                triggered_rate: sample.rate,
                triggered_at: sample.timestamp,
            });
        }
        crossed = now;
    }
    events
}

/// Events for rules that crossed their threshold at `current`.
///
/// A rule already crossed at `previous` stays quiet until the rate returns
/// to the other side. A `previous` sample taken before the rule existed is
/// ignored, so a rule created while already crossed fires once.
pub fn detect_triggers(
    rules: &[AlertRule],
    previous: Option<&RateSample>,
    current: &RateSample,
) -> Vec<AlertEvent> {
    rules
        .iter()
        .flat_map(|rule| {
            let was_crossed = previous
                .filter(|p| p.timestamp >= rule.created_at)
                .is_some_and(|p| rule.evaluate(p.rate));
            scan_crossings(rule, was_crossed, std::slice::from_ref(current))
        })
        .collect()
}
