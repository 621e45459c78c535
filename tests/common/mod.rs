#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use fxwatch::domain::alert::{AlertEvent, AlertRule, NewAlertRule, RuleUpdate};
use fxwatch::domain::error::FxError;
pub use fxwatch::domain::rate::RateSample;
use fxwatch::ports::alert_port::AlertPort;
use fxwatch::ports::rate_port::RatePort;
use rust_decimal::Decimal;
use std::sync::Mutex;

/// In-memory rate store. Samples are kept sorted by timestamp.
#[derive(Default)]
pub struct MockRatePort {
    pub samples: Mutex<Vec<RateSample>>,
    pub error: Option<String>,
}

impl MockRatePort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_samples(self, samples: Vec<RateSample>) -> Self {
        self.insert_samples(&samples).unwrap();
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }

    fn check(&self) -> Result<(), FxError> {
        match &self.error {
            Some(reason) => Err(FxError::Database {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl RatePort for MockRatePort {
    fn fetch_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RateSample>, FxError> {
        self.check()?;
        Ok(self
            .samples
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.timestamp >= start && s.timestamp <= end)
            .cloned()
            .collect())
    }

    fn latest(&self, limit: usize) -> Result<Vec<RateSample>, FxError> {
        self.check()?;
        let samples = self.samples.lock().unwrap();
        let skip = samples.len().saturating_sub(limit);
        Ok(samples[skip..].to_vec())
    }

    fn insert_samples(&self, new: &[RateSample]) -> Result<usize, FxError> {
        self.check()?;
        let mut samples = self.samples.lock().unwrap();
        let mut inserted = 0;
        for s in new {
            if samples.iter().all(|e| e.timestamp != s.timestamp) {
                samples.push(s.clone());
                inserted += 1;
            }
        }
        samples.sort_by_key(|s| s.timestamp);
        Ok(inserted)
    }

    fn data_range(&self) -> Result<Option<(DateTime<Utc>, DateTime<Utc>, usize)>, FxError> {
        self.check()?;
        let samples = self.samples.lock().unwrap();
        Ok(match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp, samples.len())),
            _ => None,
        })
    }
}

/// In-memory alert store with the same owner scoping and at-most-once event
/// semantics as the SQLite adapter.
#[derive(Default)]
pub struct MockAlertPort {
    pub rules: Mutex<Vec<AlertRule>>,
    pub events: Mutex<Vec<AlertEvent>>,
}

impl MockAlertPort {
    pub fn new() -> Self {
        Self::default()
    }

    fn owned(&self, id: i64, owner: &str) -> Result<AlertRule, FxError> {
        self.rules
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id && r.owner == owner)
            .cloned()
            .ok_or(FxError::RuleNotFound { id })
    }

    fn replace(&self, rule: AlertRule) -> AlertRule {
        let mut rules = self.rules.lock().unwrap();
        if let Some(slot) = rules.iter_mut().find(|r| r.id == rule.id) {
            *slot = rule.clone();
        }
        rule
    }
}

impl AlertPort for MockAlertPort {
    fn create_rule(
        &self,
        rule: &NewAlertRule,
        created_at: DateTime<Utc>,
    ) -> Result<AlertRule, FxError> {
        let mut rules = self.rules.lock().unwrap();
        let created = AlertRule {
            id: rules.len() as i64 + 1,
            owner: rule.owner.clone(),
            threshold_rate: rule.threshold_rate,
            direction: rule.direction,
            active: true,
            created_at,
            last_checked_at: None,
        };
        rules.push(created.clone());
        Ok(created)
    }

    fn get_rule(&self, id: i64) -> Result<Option<AlertRule>, FxError> {
        Ok(self.rules.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    fn list_rules(&self, owner: &str) -> Result<Vec<AlertRule>, FxError> {
        Ok(self
            .rules
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.owner == owner)
            .cloned()
            .collect())
    }

    fn active_rules(&self) -> Result<Vec<AlertRule>, FxError> {
        Ok(self
            .rules
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.active)
            .cloned()
            .collect())
    }

    fn update_rule(&self, id: i64, owner: &str, update: &RuleUpdate) -> Result<AlertRule, FxError> {
        update.validate()?;
        let rule = self.owned(id, owner)?;
        Ok(self.replace(update.apply(&rule)))
    }

    fn deactivate_rule(&self, id: i64, owner: &str) -> Result<AlertRule, FxError> {
        let rule = self.owned(id, owner)?;
        Ok(self.replace(rule.deactivated()))
    }

    fn record_event(&self, event: &AlertEvent) -> Result<bool, FxError> {
        let mut events = self.events.lock().unwrap();
        if events
            .iter()
            .any(|e| e.rule_id == event.rule_id && e.triggered_at == event.triggered_at)
        {
            return Ok(false);
        }
        events.push(event.clone());
        Ok(true)
    }

    fn mark_checked(&self, id: i64, at: DateTime<Utc>) -> Result<(), FxError> {
        let mut rules = self.rules.lock().unwrap();
        if let Some(rule) = rules.iter_mut().find(|r| r.id == id) {
            rule.last_checked_at = rule.last_checked_at.max(Some(at));
        }
        Ok(())
    }

    fn history(&self, owner: &str) -> Result<Vec<AlertEvent>, FxError> {
        let owned: Vec<i64> = self.list_rules(owner)?.iter().map(|r| r.id).collect();
        let mut events: Vec<AlertEvent> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| owned.contains(&e.rule_id))
            .cloned()
            .collect();
        events.sort_by(|a, b| b.triggered_at.cmp(&a.triggered_at));
        Ok(events)
    }
}

pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn sample(timestamp: DateTime<Utc>, rate: Decimal) -> RateSample {
    let spread = Decimal::TEN;
    RateSample {
        rate,
        buy_rate: rate - spread,
        sell_rate: rate + spread,
        timestamp,
        source: "test".to_string(),
    }
}

/// One sample per hour starting at `start`.
pub fn hourly(start: DateTime<Utc>, rates: &[Decimal]) -> Vec<RateSample> {
    rates
        .iter()
        .enumerate()
        .map(|(i, r)| sample(start + Duration::hours(i as i64), *r))
        .collect()
}

/// `count` hourly samples at a constant rate.
pub fn flat(start: DateTime<Utc>, rate: Decimal, count: usize) -> Vec<RateSample> {
    hourly(start, &vec![rate; count])
}
