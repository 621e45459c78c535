//! HTTP request handlers for the JSON API.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::alert::{AlertEvent, AlertRule, Direction, NewAlertRule, RuleUpdate};
use crate::domain::analytics::{Dashboard, Summary, build_dashboard, summarize};
use crate::domain::error::FxError;
use crate::domain::mock_data::generate_mock_series;
use crate::domain::monitor::{self, CheckOutcome};
use crate::domain::rate::RateSample;
use crate::domain::timeframe::Timeframe;

use super::{AppState, Owner, WebError};

/// The history endpoint defaults to a week regardless of configuration.
const HISTORY_DEFAULT_TIMEFRAME: Timeframe = Timeframe::SevenDays;

#[derive(Debug, Default, Deserialize)]
pub struct TimeframeQuery {
    pub timeframe: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RateHistory {
    pub timeframe: Timeframe,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub samples: Vec<RateSample>,
}

#[derive(Debug, Serialize)]
pub struct MockInserted {
    pub generated: usize,
    pub inserted: usize,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub timeframe: Timeframe,
    pub samples: usize,
    #[serde(flatten)]
    pub dashboard: Dashboard,
}

#[derive(Debug, Deserialize)]
pub struct CreateAlertRequest {
    pub threshold_rate: Decimal,
    pub direction: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAlertRequest {
    pub threshold_rate: Option<Decimal>,
    pub direction: Option<String>,
}

impl UpdateAlertRequest {
    fn into_update(self) -> Result<RuleUpdate, FxError> {
        let direction = self
            .direction
            .as_deref()
            .map(str::parse::<Direction>)
            .transpose()?;
        let update = RuleUpdate {
            threshold_rate: self.threshold_rate,
            direction,
        };
        update.validate()?;
        Ok(update)
    }
}

fn resolve_timeframe(query: &TimeframeQuery, default: Timeframe) -> Timeframe {
    query
        .timeframe
        .as_deref()
        .map(Timeframe::parse)
        .unwrap_or(default)
}

fn series_for(state: &AppState, timeframe: Timeframe) -> Result<Vec<RateSample>, FxError> {
    let (start, end) = timeframe.range(Utc::now());
    state.rates.fetch_range(start, end)
}

fn insert_mock(state: &AppState) -> Result<MockInserted, FxError> {
    let series = generate_mock_series(&state.mock, Utc::now(), &mut rand::thread_rng());
    let inserted = state.rates.insert_samples(&series)?;
    tracing::info!(generated = series.len(), inserted, "mock rate data stored");
    Ok(MockInserted {
        generated: series.len(),
        inserted,
    })
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

pub async fn current_rate(State(state): State<Arc<AppState>>) -> Result<Json<RateSample>, WebError> {
    if let Some(sample) = state.rates.latest(1)?.pop() {
        return Ok(Json(sample));
    }
    if !state.seed_on_empty {
        return Err(WebError::not_found("no rate data available"));
    }

    insert_mock(&state)?;
    state
        .rates
        .latest(1)?
        .pop()
        .map(Json)
        .ok_or_else(|| WebError::not_found("no rate data available"))
}

pub async fn rate_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TimeframeQuery>,
) -> Result<Json<RateHistory>, WebError> {
    let timeframe = resolve_timeframe(&query, HISTORY_DEFAULT_TIMEFRAME);
    let (start, end) = timeframe.range(Utc::now());
    let samples = state.rates.fetch_range(start, end)?;
    Ok(Json(RateHistory {
        timeframe,
        start,
        end,
        samples,
    }))
}

pub async fn generate_mock(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
) -> Result<(StatusCode, Json<MockInserted>), WebError> {
    tracing::debug!(%owner, "mock data requested");
    Ok((StatusCode::CREATED, Json(insert_mock(&state)?)))
}

pub async fn analytics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TimeframeQuery>,
) -> Result<Json<AnalyticsResponse>, WebError> {
    let timeframe = resolve_timeframe(&query, state.default_timeframe);
    let series = series_for(&state, timeframe)?;
    tracing::debug!(%timeframe, samples = series.len(), "building dashboard");
    Ok(Json(AnalyticsResponse {
        timeframe,
        samples: series.len(),
        dashboard: build_dashboard(&series, &state.analytics),
    }))
}

pub async fn analytics_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TimeframeQuery>,
) -> Result<Json<Summary>, WebError> {
    let timeframe = resolve_timeframe(&query, state.default_timeframe);
    let series = series_for(&state, timeframe)?;
    Ok(Json(summarize(&series)?))
}

pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
) -> Result<Json<Vec<AlertRule>>, WebError> {
    Ok(Json(state.alerts.list_rules(&owner)?))
}

pub async fn create_alert(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Json(req): Json<CreateAlertRequest>,
) -> Result<(StatusCode, Json<AlertRule>), WebError> {
    let rule = NewAlertRule::new(&owner, req.threshold_rate, &req.direction)?;
    let created = state.alerts.create_rule(&rule, Utc::now())?;
    tracing::info!(id = created.id, owner = %created.owner, "alert rule created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_alert(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<i64>,
    Json(req): Json<UpdateAlertRequest>,
) -> Result<Json<AlertRule>, WebError> {
    let update = req.into_update()?;
    Ok(Json(state.alerts.update_rule(id, &owner, &update)?))
}

pub async fn deactivate_alert(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<i64>,
) -> Result<Json<AlertRule>, WebError> {
    Ok(Json(state.alerts.deactivate_rule(id, &owner)?))
}

pub async fn alert_history(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
) -> Result<Json<Vec<AlertEvent>>, WebError> {
    Ok(Json(state.alerts.history(&owner)?))
}

pub async fn check_alerts(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
) -> Result<Json<CheckOutcome>, WebError> {
    tracing::debug!(%owner, "alert check requested");
    Ok(Json(monitor::check_alerts(&*state.rates, &*state.alerts)?))
}

pub async fn not_found() -> WebError {
    WebError::not_found("no such route")
}
