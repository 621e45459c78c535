//! One polling tick of the alert monitor.
//!
//! Every active rule keeps a watermark: the timestamp of the newest sample it
//! was evaluated against. A tick scans all samples past each rule's watermark,
//! so a crossing inside a batch import or between missed ticks is still
//! recorded, then advances the watermark to the newest sample.

use serde::Serialize;

use crate::domain::alert::{AlertEvent, AlertRule, scan_crossings};
use crate::domain::error::FxError;
use crate::domain::rate::RateSample;
use crate::ports::alert_port::AlertPort;
use crate::ports::rate_port::RatePort;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckOutcome {
    pub recorded: Vec<AlertEvent>,
    pub duplicates: usize,
    pub rules_checked: usize,
}

pub fn check_alerts(rates: &dyn RatePort, alerts: &dyn AlertPort) -> Result<CheckOutcome, FxError> {
    let Some(newest) = rates.latest(1)?.pop() else {
        tracing::debug!("no rate samples yet, skipping alert check");
        return Ok(CheckOutcome::default());
    };

    let rules = alerts.active_rules()?;
    let mut outcome = CheckOutcome {
        rules_checked: rules.len(),
        ..CheckOutcome::default()
    };

    let since = rules
        .iter()
        .map(|r| r.last_checked_at.unwrap_or(r.created_at))
        .min()
        .map(|t| t.min(newest.timestamp));
    let series = match since {
        Some(start) => rates.fetch_range(start, newest.timestamp)?,
        None => return Ok(outcome),
    };

    for rule in &rules {
        let (was_crossed, unseen) = pending(rule, &series);
        for event in scan_crossings(rule, was_crossed, unseen) {
            if alerts.record_event(&event)? {
                tracing::info!(
                    rule_id = event.rule_id,
                    rate = %event.triggered_rate,
                    at = %event.triggered_at,
                    "alert triggered"
                );
                outcome.recorded.push(event);
            } else {
                tracing::debug!(rule_id = event.rule_id, "alert already recorded for this sample");
                outcome.duplicates += 1;
            }
        }
        if rule.last_checked_at.is_none_or(|t| t < newest.timestamp) {
            alerts.mark_checked(rule.id, newest.timestamp)?;
        }
    }

    Ok(outcome)
}

/// The rule's state before its unevaluated samples, and those samples.
///
/// A rule never checked before starts unarmed at its first sample since
/// creation. With no sample since creation it is judged on the newest one, so
/// a rule created while the threshold is already crossed fires once.
fn pending<'a>(rule: &AlertRule, series: &'a [RateSample]) -> (bool, &'a [RateSample]) {
    match rule.last_checked_at {
        Some(checked) => {
            let split = series.partition_point(|s| s.timestamp <= checked);
            let was_crossed = split
                .checked_sub(1)
                .is_some_and(|i| rule.evaluate(series[i].rate));
            (was_crossed, &series[split..])
        }
        None => {
            let split = series
                .partition_point(|s| s.timestamp < rule.created_at)
                .min(series.len().saturating_sub(1));
            (false, &series[split..])
        }
    }
}
