//! JSON API over axum.
//!
//! Serves current and historical rates, the analytics dashboard, and alert
//! rule management. Alert routes are scoped to the user named in the
//! `X-Forwarded-User` header set by the fronting proxy. Routes that write
//! rate data or run the monitor also require that header.

mod error;
mod handlers;

pub use error::{WebError, status_from_error};
pub use handlers::*;

use axum::{
    Router,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, patch, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::domain::analytics::AnalyticsParams;
use crate::domain::mock_data::MockParams;
use crate::domain::timeframe::Timeframe;
use crate::ports::alert_port::AlertPort;
use crate::ports::rate_port::RatePort;

pub const OWNER_HEADER: &str = "x-forwarded-user";

pub struct AppState {
    pub rates: Arc<dyn RatePort + Send + Sync>,
    pub alerts: Arc<dyn AlertPort + Send + Sync>,
    pub analytics: AnalyticsParams,
    pub default_timeframe: Timeframe,
    pub mock: MockParams,
    /// Generate mock data when `/api/rates/current` finds the store empty.
    pub seed_on_empty: bool,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/rates/current", get(handlers::current_rate))
        .route("/api/rates/history", get(handlers::rate_history))
        .route("/api/rates/mock", post(handlers::generate_mock))
        .route("/api/analytics", get(handlers::analytics))
        .route("/api/analytics/summary", get(handlers::analytics_summary))
        .route(
            "/api/alerts",
            get(handlers::list_alerts).post(handlers::create_alert),
        )
        .route("/api/alerts/history", get(handlers::alert_history))
        .route("/api/alerts/check", post(handlers::check_alerts))
        .route("/api/alerts/{id}", patch(handlers::update_alert))
        .route("/api/alerts/{id}/deactivate", post(handlers::deactivate_alert))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// The authenticated user, taken from [`OWNER_HEADER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Owner {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(OWNER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Owner(v.to_string()))
            .ok_or_else(|| WebError::unauthorized("missing X-Forwarded-User header"))
    }
}
