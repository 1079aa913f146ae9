//! API response structures

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{
    error::EngineError,
    state::{format_remaining, Interval, Phase, Snapshot},
};

/// Snapshot as presented to clients
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotView {
    pub phase: Phase,
    pub paused_from: Option<Interval>,
    pub current_round: u32,
    pub total_rounds: u32,
    pub focus_minutes: u32,
    pub break_minutes: u32,
    /// Epoch milliseconds
    pub deadline: Option<i64>,
    pub deadline_at: Option<DateTime<Utc>>,
    /// Time left, clamped to zero
    pub remaining_ms: i64,
    pub remaining: String,
}

impl SnapshotView {
    pub fn at(snapshot: &Snapshot, now_ms: i64) -> Self {
        let remaining_ms = snapshot.remaining_at(now_ms);
        Self {
            phase: snapshot.phase,
            paused_from: snapshot.phase.paused_from(),
            current_round: snapshot.current_round,
            total_rounds: snapshot.config.total_rounds,
            focus_minutes: snapshot.config.focus_minutes,
            break_minutes: snapshot.config.break_minutes,
            deadline: snapshot.deadline,
            deadline_at: snapshot.deadline.and_then(DateTime::<Utc>::from_timestamp_millis),
            remaining_ms,
            remaining: format_remaining(remaining_ms),
        }
    }
}

/// API response structure for command endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: SnapshotView,
}

impl ApiResponse {
    /// Create a successful command response
    pub fn ok(message: impl Into<String>, timer: SnapshotView) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            timestamp: Utc::now(),
            timer,
        }
    }
}

/// Body of `PUT /config`.
///
/// Signed so that zero and negative values reach validation and come back
/// as a 400 rather than a deserialization rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigRequest {
    pub focus_minutes: i64,
    pub break_minutes: i64,
    pub total_rounds: i64,
}

/// Status response with server metadata
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub timer: SnapshotView,
    pub counting_down: bool,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Engine error mapped onto an HTTP status
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::InvalidConfig { .. } => StatusCode::BAD_REQUEST,
            EngineError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        if status.is_server_error() {
            error!("Command failed: {}", self.0);
        }
        let body = ErrorResponse {
            status: "error".to_string(),
            message: self.0.to_string(),
            timestamp: Utc::now(),
        };
        (status, Json(body)).into_response()
    }
}
