//! HTTP endpoint handlers

use std::{convert::Infallible, sync::Arc};
use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use futures::stream::{Stream, StreamExt};
use tracing::{info, warn};

use crate::{
    error::EngineResult,
    state::{AppState, Snapshot, TimerConfig},
};
use super::responses::{
    ApiError, ApiResponse, ConfigRequest, HealthResponse, SnapshotView, StatusResponse,
};

/// Turn a command outcome into a response, recording accepted commands
fn respond(
    state: &AppState,
    action: &str,
    message: &str,
    result: EngineResult<Snapshot>,
) -> Result<Json<ApiResponse>, ApiError> {
    let snapshot = result?;
    state.record_action(action);
    info!("{} endpoint called - phase now {}", action, snapshot.phase.name());
    Ok(Json(ApiResponse::ok(
        message,
        SnapshotView::at(&snapshot, state.now_ms()),
    )))
}

/// Handle POST /start - Start a cycle or resume a paused interval
pub async fn start_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, ApiError> {
    let result = state.engine.start().await;
    respond(&state, "start", "Timer running", result)
}

/// Handle POST /pause - Pause the running interval
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, ApiError> {
    let result = state.engine.pause().await;
    respond(&state, "pause", "Timer paused", result)
}

/// Handle POST /stop - Stop and return to idle
pub async fn stop_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, ApiError> {
    let result = state.engine.stop().await;
    respond(&state, "stop", "Timer stopped", result)
}

/// Handle POST /reset - Reset the schedule, keeping configuration
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse>, ApiError> {
    let result = state.engine.reset().await;
    respond(&state, "reset", "Timer reset", result)
}

/// Handle PUT /config - Update durations and round count
pub async fn config_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConfigRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    let config = match TimerConfig::try_new(request.focus_minutes, request.break_minutes, request.total_rounds) {
        Ok(config) => config,
        Err(e) => {
            warn!("Rejected config update: {}", e);
            return Err(e.into());
        }
    };
    let result = state.engine.update_config(config).await;
    respond(&state, "config", "Configuration updated", result)
}

/// Handle GET /status - Return current timer status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let snapshot = state.snapshot();
    let (last_action, last_action_time) = state.get_last_action();

    Json(StatusResponse {
        timer: SnapshotView::at(&snapshot, state.now_ms()),
        counting_down: state.engine.is_counting_down().await,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /events - Stream snapshots as server-sent events
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let clock_state = Arc::clone(&state);
    let stream = state.store().subscribe().map(move |snapshot| {
        let view = SnapshotView::at(&snapshot, clock_state.now_ms());
        let data = serde_json::to_string(&view).unwrap_or_default();
        Ok(Event::default().event("snapshot").data(data))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
