//! SQLite store for rate samples, alert rules and alert history.
//!
//! Timestamps are stored as UTC unix milliseconds so range queries compare
//! integers. Decimals are stored as TEXT to keep every digit.

use crate::domain::alert::{AlertEvent, AlertRule, Direction, NewAlertRule, RuleUpdate};
use crate::domain::config_validation::pool_size;
use crate::domain::error::FxError;
use crate::domain::rate::RateSample;
use crate::ports::alert_port::AlertPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::rate_port::RatePort;
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::str::FromStr;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS rates (
    timestamp INTEGER PRIMARY KEY,
    rate TEXT NOT NULL,
    buy_rate TEXT NOT NULL,
    sell_rate TEXT NOT NULL,
    source TEXT NOT NULL DEFAULT 'mock_api'
);
CREATE TABLE IF NOT EXISTS alert_rules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner TEXT NOT NULL,
    threshold_rate TEXT NOT NULL,
    direction TEXT NOT NULL CHECK (direction IN ('above', 'below')),
    active INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL,
    last_checked_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_alert_rules_owner ON alert_rules(owner);
CREATE TABLE IF NOT EXISTS alert_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    rule_id INTEGER NOT NULL REFERENCES alert_rules(id) ON DELETE CASCADE,
    triggered_rate TEXT NOT NULL,
    triggered_at INTEGER NOT NULL,
    UNIQUE (rule_id, triggered_at)
);";

const RULE_COLUMNS: &str =
    "id, owner, threshold_rate, direction, active, created_at, last_checked_at";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_error(e: r2d2::Error) -> FxError {
    FxError::Database {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> FxError {
    FxError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn conversion_error(idx: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

fn sample_from_row(row: &Row<'_>) -> rusqlite::Result<RateSample> {
    Ok(RateSample {
        timestamp: timestamp_column(row, 0)?,
        rate: decimal_column(row, 1)?,
        buy_rate: decimal_column(row, 2)?,
        sell_rate: decimal_column(row, 3)?,
        source: row.get(4)?,
    })
}

fn rule_from_row(row: &Row<'_>) -> rusqlite::Result<AlertRule> {
    let direction_raw: String = row.get(3)?;
    let direction = Direction::from_str(&direction_raw).map_err(|e| conversion_error(3, e))?;
    Ok(AlertRule {
        id: row.get(0)?,
        owner: row.get(1)?,
        threshold_rate: decimal_column(row, 2)?,
        direction,
        active: row.get(4)?,
        created_at: timestamp_column(row, 5)?,
        last_checked_at: row
            .get::<_, Option<i64>>(6)?
            .map(|millis| {
                DateTime::<Utc>::from_timestamp_millis(millis)
                    .ok_or(rusqlite::Error::IntegralValueOutOfRange(6, millis))
            })
            .transpose()?,
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<AlertEvent> {
    Ok(AlertEvent {
        rule_id: row.get(0)?,
        triggered_rate: decimal_column(row, 1)?,
        triggered_at: timestamp_column(row, 2)?,
    })
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, FxError> {
        let db_path = config
            .get_string("sqlite", "path")
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| FxError::ConfigMissing {
                section: "sqlite".into(),
                key: "path".into(),
            })?;

        let pool_size = pool_size(config)?;

        let manager = SqliteConnectionManager::file(db_path.trim()).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
        });
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_error)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        tracing::debug!(path = %db_path, pool_size, "opened sqlite pool");
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, FxError> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_error)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, FxError> {
        self.pool.get().map_err(pool_error)
    }

    /// Create any missing tables. Both constructors call this.
    pub fn initialize_schema(&self) -> Result<(), FxError> {
        self.conn()?.execute_batch(SCHEMA).map_err(query_error)
    }

    fn owned_rule(&self, id: i64, owner: &str) -> Result<AlertRule, FxError> {
        match self.get_rule(id)? {
            Some(rule) if rule.owner == owner => Ok(rule),
            _ => Err(FxError::RuleNotFound { id }),
        }
    }
}

impl RatePort for SqliteAdapter {
    fn fetch_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RateSample>, FxError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT timestamp, rate, buy_rate, sell_rate, source
                 FROM rates
                 WHERE timestamp >= ?1 AND timestamp <= ?2
                 ORDER BY timestamp ASC",
            )
            .map_err(query_error)?;

        let rows = stmt
            .query_map(
                params![start.timestamp_millis(), end.timestamp_millis()],
                sample_from_row,
            )
            .map_err(query_error)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_error)
    }

    fn latest(&self, limit: usize) -> Result<Vec<RateSample>, FxError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT timestamp, rate, buy_rate, sell_rate, source
                 FROM rates
                 ORDER BY timestamp DESC
                 LIMIT ?1",
            )
            .map_err(query_error)?;

        let rows = stmt
            .query_map(params![limit as i64], sample_from_row)
            .map_err(query_error)?;

        let mut samples = rows.collect::<Result<Vec<_>, _>>().map_err(query_error)?;
        samples.reverse();
        Ok(samples)
    }

    fn insert_samples(&self, samples: &[RateSample]) -> Result<usize, FxError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_error)?;

        let mut inserted = 0;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR IGNORE INTO rates (timestamp, rate, buy_rate, sell_rate, source)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(query_error)?;

            for s in samples {
                inserted += stmt
                    .execute(params![
                        s.timestamp.timestamp_millis(),
                        s.rate.to_string(),
                        s.buy_rate.to_string(),
                        s.sell_rate.to_string(),
                        s.source,
                    ])
                    .map_err(query_error)?;
            }
        }

        tx.commit().map_err(query_error)?;
        Ok(inserted)
    }

    fn data_range(&self) -> Result<Option<(DateTime<Utc>, DateTime<Utc>, usize)>, FxError> {
        let conn = self.conn()?;
        let result: (Option<i64>, Option<i64>, i64) = conn
            .query_row(
                "SELECT MIN(timestamp), MAX(timestamp), COUNT(*) FROM rates",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_error)?;

        match result {
            (Some(min), Some(max), count) if count > 0 => {
                let to_dt = |ms: i64| {
                    DateTime::<Utc>::from_timestamp_millis(ms).ok_or_else(|| FxError::Database {
                        reason: format!("timestamp {ms} out of range"),
                    })
                };
                Ok(Some((to_dt(min)?, to_dt(max)?, count as usize)))
            }
            _ => Ok(None),
        }
    }
}

impl AlertPort for SqliteAdapter {
    fn create_rule(
        &self,
        rule: &NewAlertRule,
        created_at: DateTime<Utc>,
    ) -> Result<AlertRule, FxError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO alert_rules (owner, threshold_rate, direction, active, created_at)
             VALUES (?1, ?2, ?3, 1, ?4)",
            params![
                rule.owner,
                rule.threshold_rate.to_string(),
                rule.direction.as_str(),
                created_at.timestamp_millis(),
            ],
        )
        .map_err(query_error)?;

        Ok(AlertRule {
            id: conn.last_insert_rowid(),
            owner: rule.owner.clone(),
            threshold_rate: rule.threshold_rate,
            direction: rule.direction,
            active: true,
            created_at,
            last_checked_at: None,
        })
    }

    fn get_rule(&self, id: i64) -> Result<Option<AlertRule>, FxError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {RULE_COLUMNS} FROM alert_rules WHERE id = ?1"),
            params![id],
            rule_from_row,
        )
        .optional()
        .map_err(query_error)
    }

    fn list_rules(&self, owner: &str) -> Result<Vec<AlertRule>, FxError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {RULE_COLUMNS} FROM alert_rules WHERE owner = ?1 ORDER BY id"
            ))
            .map_err(query_error)?;
        let rows = stmt
            .query_map(params![owner], rule_from_row)
            .map_err(query_error)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_error)
    }

    fn active_rules(&self) -> Result<Vec<AlertRule>, FxError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {RULE_COLUMNS} FROM alert_rules WHERE active = 1 ORDER BY id"
            ))
            .map_err(query_error)?;
        let rows = stmt.query_map([], rule_from_row).map_err(query_error)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_error)
    }

    fn update_rule(
        &self,
        id: i64,
        owner: &str,
        update: &RuleUpdate,
    ) -> Result<AlertRule, FxError> {
        update.validate()?;
        let updated = update.apply(&self.owned_rule(id, owner)?);

        self.conn()?
            .execute(
                "UPDATE alert_rules SET threshold_rate = ?1, direction = ?2 WHERE id = ?3",
                params![
                    updated.threshold_rate.to_string(),
                    updated.direction.as_str(),
                    id
                ],
            )
            .map_err(query_error)?;

        Ok(updated)
    }

    fn deactivate_rule(&self, id: i64, owner: &str) -> Result<AlertRule, FxError> {
        let rule = self.owned_rule(id, owner)?;
        if !rule.active {
            return Ok(rule);
        }

        self.conn()?
            .execute("UPDATE alert_rules SET active = 0 WHERE id = ?1", params![id])
            .map_err(query_error)?;

        Ok(rule.deactivated())
    }

    fn record_event(&self, event: &AlertEvent) -> Result<bool, FxError> {
        let changed = self
            .conn()?
            .execute(
                "INSERT OR IGNORE INTO alert_history (rule_id, triggered_rate, triggered_at)
                 VALUES (?1, ?2, ?3)",
                params![
                    event.rule_id,
                    event.triggered_rate.to_string(),
                    event.triggered_at.timestamp_millis(),
                ],
            )
            .map_err(query_error)?;
        Ok(changed == 1)
    }

    fn mark_checked(&self, id: i64, at: DateTime<Utc>) -> Result<(), FxError> {
        self.conn()?
            .execute(
                "UPDATE alert_rules
                 SET last_checked_at = MAX(COALESCE(last_checked_at, ?2), ?2)
                 WHERE id = ?1",
                params![id, at.timestamp_millis()],
            )
            .map_err(query_error)?;
        Ok(())
    }

    fn history(&self, owner: &str) -> Result<Vec<AlertEvent>, FxError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT h.rule_id, h.triggered_rate, h.triggered_at
                 FROM alert_history h
                 JOIN alert_rules r ON r.id = h.rule_id
                 WHERE r.owner = ?1
                 ORDER BY h.triggered_at DESC, h.id DESC",
            )
            .map_err(query_error)?;
        let rows = stmt
            .query_map(params![owner], event_from_row)
            .map_err(query_error)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(query_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn adapter() -> SqliteAdapter {
        SqliteAdapter::in_memory().unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    fn sample(hours: i64, rate: Decimal) -> RateSample {
        RateSample {
            rate,
            buy_rate: rate - dec!(10),
            sell_rate: rate + dec!(10),
            timestamp: t0() + Duration::hours(hours),
            source: "mock_api".into(),
        }
    }

    fn new_rule(owner: &str, threshold: Decimal, direction: &str) -> NewAlertRule {
        NewAlertRule::new(owner, threshold, direction).unwrap()
    }

    #[test]
    fn from_config_missing_path() {
        let config = FileConfigAdapter::from_string("[web]\nlisten = 127.0.0.1:3000\n").unwrap();
        match SqliteAdapter::from_config(&config) {
            Err(FxError::ConfigMissing { section, key }) => {
                assert_eq!(section, "sqlite");
                assert_eq!(key, "path");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn from_config_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rates.db");
        let config =
            FileConfigAdapter::from_string(&format!("[sqlite]\npath = {}\n", path.display()))
                .unwrap();
        let adapter = SqliteAdapter::from_config(&config).unwrap();
        assert_eq!(adapter.insert_samples(&[sample(0, dec!(3800))]).unwrap(), 1);
        assert!(path.exists());
    }

    #[test]
    fn schema_initialization_is_repeatable() {
        let adapter = adapter();
        adapter.initialize_schema().unwrap();
    }

    #[test]
    fn fetch_range_is_inclusive_and_ascending() {
        let adapter = adapter();
        let samples: Vec<RateSample> = (0..6)
            .rev()
            .map(|h| sample(h, dec!(3800) + Decimal::from(h)))
            .collect();
        adapter.insert_samples(&samples).unwrap();

        let fetched = adapter
            .fetch_range(t0() + Duration::hours(1), t0() + Duration::hours(4))
            .unwrap();
        assert_eq!(fetched.len(), 4);
        assert_eq!(fetched[0].rate, dec!(3801));
        assert_eq!(fetched[3].rate, dec!(3804));
        assert!(fetched.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn decimals_round_trip_exactly() {
        let adapter = adapter();
        let s = RateSample {
            rate: dec!(3801.2345),
            buy_rate: dec!(3791.2345),
            sell_rate: dec!(3811.2345),
            timestamp: t0(),
            source: "live".into(),
        };
        adapter.insert_samples(std::slice::from_ref(&s)).unwrap();
        assert_eq!(adapter.latest(1).unwrap(), vec![s]);
    }

    #[test]
    fn duplicate_timestamps_are_ignored() {
        let adapter = adapter();
        assert_eq!(adapter.insert_samples(&[sample(0, dec!(3800))]).unwrap(), 1);
        assert_eq!(
            adapter
                .insert_samples(&[sample(0, dec!(3900)), sample(1, dec!(3810))])
                .unwrap(),
            1
        );
        let all = adapter.fetch_range(t0(), t0() + Duration::hours(1)).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].rate, dec!(3800));
    }

    #[test]
    fn latest_returns_most_recent_ascending() {
        let adapter = adapter();
        let samples: Vec<RateSample> = (0..5).map(|h| sample(h, dec!(3800))).collect();
        adapter.insert_samples(&samples).unwrap();

        let latest = adapter.latest(2).unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].timestamp, t0() + Duration::hours(3));
        assert_eq!(latest[1].timestamp, t0() + Duration::hours(4));
    }

    #[test]
    fn data_range_empty_and_populated() {
        let adapter = adapter();
        assert!(adapter.data_range().unwrap().is_none());

        adapter
            .insert_samples(&[sample(0, dec!(3800)), sample(9, dec!(3810))])
            .unwrap();
        let (first, last, count) = adapter.data_range().unwrap().unwrap();
        assert_eq!(first, t0());
        assert_eq!(last, t0() + Duration::hours(9));
        assert_eq!(count, 2);
    }

    #[test]
    fn rule_lifecycle() {
        let adapter = adapter();
        let created = adapter
            .create_rule(&new_rule("alice", dec!(3850), "above"), t0())
            .unwrap();
        assert!(created.active);
        assert_eq!(adapter.get_rule(created.id).unwrap(), Some(created.clone()));

        let updated = adapter
            .update_rule(
                created.id,
                "alice",
                &RuleUpdate {
                    threshold_rate: Some(dec!(3700)),
                    direction: Some(Direction::Below),
                },
            )
            .unwrap();
        assert_eq!(updated.threshold_rate, dec!(3700));
        assert_eq!(updated.direction, Direction::Below);
        assert_eq!(adapter.get_rule(created.id).unwrap(), Some(updated));

        let inactive = adapter.deactivate_rule(created.id, "alice").unwrap();
        assert!(!inactive.active);
        assert!(adapter.active_rules().unwrap().is_empty());
        assert_eq!(adapter.list_rules("alice").unwrap().len(), 1);

        let again = adapter.deactivate_rule(created.id, "alice").unwrap();
        assert!(!again.active);
    }

    #[test]
    fn rules_are_scoped_to_owner() {
        let adapter = adapter();
        let rule = adapter
            .create_rule(&new_rule("alice", dec!(3850), "above"), t0())
            .unwrap();
        adapter
            .create_rule(&new_rule("bob", dec!(3700), "below"), t0())
            .unwrap();

        assert_eq!(adapter.list_rules("alice").unwrap().len(), 1);
        assert!(matches!(
            adapter.deactivate_rule(rule.id, "bob"),
            Err(FxError::RuleNotFound { .. })
        ));
        assert!(matches!(
            adapter.update_rule(rule.id, "bob", &RuleUpdate::default()),
            Err(FxError::RuleNotFound { .. })
        ));
        assert!(matches!(
            adapter.deactivate_rule(999, "alice"),
            Err(FxError::RuleNotFound { id: 999 })
        ));
    }

    #[test]
    fn invalid_update_is_rejected() {
        let adapter = adapter();
        let rule = adapter
            .create_rule(&new_rule("alice", dec!(3850), "above"), t0())
            .unwrap();
        let bad = RuleUpdate {
            threshold_rate: Some(dec!(-5)),
            direction: None,
        };
        assert!(matches!(
            adapter.update_rule(rule.id, "alice", &bad),
            Err(FxError::InvalidRule { .. })
        ));
    }

    #[test]
    fn events_are_recorded_at_most_once() {
        let adapter = adapter();
        let rule = adapter
            .create_rule(&new_rule("alice", dec!(3850), "above"), t0())
            .unwrap();
        let event = AlertEvent {
            rule_id: rule.id,
            triggered_rate: dec!(3900),
            triggered_at: t0() + Duration::hours(2),
        };

        assert!(adapter.record_event(&event).unwrap());
        assert!(!adapter.record_event(&event).unwrap());
        assert_eq!(adapter.history("alice").unwrap(), vec![event]);
        assert!(adapter.history("bob").unwrap().is_empty());
    }

    #[test]
    fn watermark_only_moves_forward() {
        let adapter = adapter();
        let rule = adapter
            .create_rule(&new_rule("alice", dec!(3850), "above"), t0())
            .unwrap();
        assert_eq!(rule.last_checked_at, None);

        adapter.mark_checked(rule.id, t0() + Duration::hours(5)).unwrap();
        adapter.mark_checked(rule.id, t0() + Duration::hours(2)).unwrap();
        let stored = adapter.get_rule(rule.id).unwrap().unwrap();
        assert_eq!(stored.last_checked_at, Some(t0() + Duration::hours(5)));
    }

    #[test]
    fn oversized_pool_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfigAdapter::from_string(&format!(
            "[sqlite]\npath = {}\npool_size = 4294967297\n",
            dir.path().join("rates.db").display()
        ))
        .unwrap();
        assert!(matches!(
            SqliteAdapter::from_config(&config),
            Err(FxError::ConfigInvalid { key, .. }) if key == "pool_size"
        ));
    }

    #[test]
    fn history_is_newest_first() {
        let adapter = adapter();
        let rule = adapter
            .create_rule(&new_rule("alice", dec!(3850), "above"), t0())
            .unwrap();
        for h in [1, 5, 3] {
            adapter
                .record_event(&AlertEvent {
                    rule_id: rule.id,
                    triggered_rate: dec!(3900),
                    triggered_at: t0() + Duration::hours(h),
                })
                .unwrap();
        }
        let times: Vec<DateTime<Utc>> = adapter
            .history("alice")
            .unwrap()
            .iter()
            .map(|e| e.triggered_at)
            .collect();
        assert_eq!(
            times,
            vec![
                t0() + Duration::hours(5),
                t0() + Duration::hours(3),
                t0() + Duration::hours(1)
            ]
        );
    }
}
