//! Standardized API responses.

use aggregator::SearchOutcome;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use telemetry::ClusterHealthReport;
use tracing::{debug, error};
use viewer_core::TopicMessage;

/// Message search result.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesResponse {
    pub messages: Vec<TopicMessage>,
    pub scanned: usize,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failed_partitions: Vec<i32>,
    pub truncated: bool,
}

impl From<SearchOutcome> for MessagesResponse {
    fn from(outcome: SearchOutcome) -> Self {
        Self {
            messages: outcome.messages,
            scanned: outcome.scanned,
            failed_partitions: outcome.failed_partitions,
            truncated: outcome.truncated,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub clusters: Vec<ClusterHealthReport>,
    pub open_readers: u64,
    pub cached_topics: u64,
    pub cached_groups: u64,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

/// API error carrying a stable error code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
        }
    }

    /// Rejected caller input, reported like any other invalid filter.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        viewer_core::Error::invalid_filter(msg).into()
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::NOT_FOUND, "NOT_FOUND", msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<viewer_core::Error> for ApiError {
    fn from(err: viewer_core::Error) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(code = err.code(), error = %err, "Request failed");
        } else {
            debug!(code = err.code(), error = %err, "Request rejected");
        }

        ApiError::with_code(status, err.code(), err.to_string())
    }
}
