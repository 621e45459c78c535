//! HTTP error responses for the JSON API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::domain::error::FxError;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }
}

impl From<FxError> for WebError {
    fn from(err: FxError) -> Self {
        let status = status_from_error(&err);
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

pub fn status_from_error(err: &FxError) -> StatusCode {
    match err {
        FxError::ConfigMissing { .. }
        | FxError::ConfigInvalid { .. }
        | FxError::ConfigParse { .. } => StatusCode::BAD_REQUEST,
        FxError::EmptySeries | FxError::InsufficientData { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        FxError::InvalidRule { .. } | FxError::Import { .. } => StatusCode::BAD_REQUEST,
        FxError::RuleNotFound { .. } => StatusCode::NOT_FOUND,
        FxError::Database { .. } | FxError::DatabaseQuery { .. } | FxError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
