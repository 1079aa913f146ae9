mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use common::{harness, Harness, MINUTE, T0};
use pomodoro_keeper::{create_router, AppState};
use serde_json::Value;
use tower::ServiceExt;

fn app(h: &Harness) -> Router {
    let state = Arc::new(AppState::new(Arc::clone(&h.engine), 20554, "127.0.0.1".to_string()));
    create_router(state)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .expect("Request failed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test(start_paused = true)]
async fn start_pause_resume_over_http() {
    let h = harness(25, 5, 4);
    let app = app(&h);

    let (status, body) = call(&app, Method::POST, "/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["phase"], "FOCUS");
    assert_eq!(body["timer"]["current_round"], 1);
    assert_eq!(body["timer"]["deadline"], T0 + 25 * MINUTE);
    assert_eq!(body["timer"]["remaining"], "25:00");

    h.clock.advance(MINUTE);
    let (status, body) = call(&app, Method::POST, "/pause", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["phase"], "PAUSED");
    assert_eq!(body["timer"]["paused_from"], "FOCUS");
    assert_eq!(body["timer"]["remaining_ms"], 24 * MINUTE);
    assert_eq!(body["timer"]["deadline"], Value::Null);

    let (_, body) = call(&app, Method::POST, "/start", None).await;
    assert_eq!(body["timer"]["phase"], "FOCUS");
    assert_eq!(body["timer"]["paused_from"], Value::Null);
}

#[tokio::test(start_paused = true)]
async fn status_reports_timer_and_last_action() {
    let h = harness(25, 5, 4);
    let app = app(&h);

    let (status, body) = call(&app, Method::GET, "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["phase"], "IDLE");
    assert_eq!(body["timer"]["focus_minutes"], 25);
    assert_eq!(body["counting_down"], false);
    assert_eq!(body["last_action"], Value::Null);

    call(&app, Method::POST, "/start", None).await;
    h.clock.advance(90_000);

    let (_, body) = call(&app, Method::GET, "/status", None).await;
    assert_eq!(body["timer"]["remaining"], "23:30");
    assert_eq!(body["counting_down"], true);
    assert_eq!(body["last_action"], "start");
}

#[tokio::test(start_paused = true)]
async fn config_validation_maps_to_bad_request() {
    let h = harness(25, 5, 4);
    let app = app(&h);

    let invalid = serde_json::json!({ "focus_minutes": 0, "break_minutes": 5, "total_rounds": 4 });
    let (status, body) = call(&app, Method::PUT, "/config", Some(invalid)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(h.store.read().config.focus_minutes, 25);

    let valid = serde_json::json!({ "focus_minutes": 50, "break_minutes": 10, "total_rounds": 2 });
    let (status, body) = call(&app, Method::PUT, "/config", Some(valid)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["focus_minutes"], 50);
    assert_eq!(body["timer"]["total_rounds"], 2);
}

#[tokio::test(start_paused = true)]
async fn storage_outage_maps_to_service_unavailable() {
    let h = harness(25, 5, 4);
    let app = app(&h);
    h.backend.set_available(false);

    let (status, body) = call(&app, Method::POST, "/start", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "error");
    assert_eq!(h.store.read().phase, pomodoro_keeper::Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn unknown_command_is_rejected_without_mutation() {
    let h = harness(25, 5, 4);
    let app = app(&h);
    let before = h.store.read();

    let (status, _) = call(&app, Method::POST, "/skip", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, Method::GET, "/start", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    assert_eq!(h.store.read(), before);
}

#[tokio::test(start_paused = true)]
async fn stop_and_reset_return_idle() {
    let h = harness(25, 5, 4);
    let app = app(&h);

    call(&app, Method::POST, "/start", None).await;
    let (status, body) = call(&app, Method::POST, "/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["phase"], "IDLE");

    call(&app, Method::POST, "/start", None).await;
    let (status, body) = call(&app, Method::POST, "/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["phase"], "IDLE");
    assert_eq!(body["timer"]["current_round"], 1);
}

#[tokio::test]
async fn health_check() {
    let h = harness(25, 5, 4);
    let (status, body) = call(&app(&h), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
