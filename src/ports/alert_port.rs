//! Alert rule and alert history store port trait.

use chrono::{DateTime, Utc};

use crate::domain::alert::{AlertEvent, AlertRule, NewAlertRule, RuleUpdate};
use crate::domain::error::FxError;

pub trait AlertPort {
    fn create_rule(
        &self,
        rule: &NewAlertRule,
        created_at: DateTime<Utc>,
    ) -> Result<AlertRule, FxError>;

    fn get_rule(&self, id: i64) -> Result<Option<AlertRule>, FxError>;

    fn list_rules(&self, owner: &str) -> Result<Vec<AlertRule>, FxError>;

    fn active_rules(&self) -> Result<Vec<AlertRule>, FxError>;

    /// Fails with `RuleNotFound` when `id` does not exist or belongs to someone else.
    fn update_rule(&self, id: i64, owner: &str, update: &RuleUpdate)
    -> Result<AlertRule, FxError>;

    fn deactivate_rule(&self, id: i64, owner: &str) -> Result<AlertRule, FxError>;

    /// Append an event. Returns `false` when the same rule already has an
    /// event at `triggered_at`.
    fn record_event(&self, event: &AlertEvent) -> Result<bool, FxError>;

    /// Advance the rule's evaluation watermark to `at`. Never moves it back.
    fn mark_checked(&self, id: i64, at: DateTime<Utc>) -> Result<(), FxError>;

    /// Events for the owner's rules, newest first.
    fn history(&self, owner: &str) -> Result<Vec<AlertEvent>, FxError>;
}
