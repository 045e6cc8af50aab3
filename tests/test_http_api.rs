mod helpers;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use helpers::*;
use serde_json::{json, Value};
use tower::ServiceExt;
use wadesk::infrastructure::http::router::build_router;

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health_check() {
    let h = setup().await;
    let app = build_router(h.state.clone());

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_attendant_going_available_picks_up_queued_chat() {
    let h = setup().await;
    let app = build_router(h.state.clone());

    let (status, inbound) = call(
        &app,
        Method::POST,
        "/api/companies/company-acme/chats/chat-1/inbound",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbound["outcome"]["outcome"], "no_attendant_available");

    let (status, queue) = call(&app, Method::GET, "/api/companies/company-acme/queue", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue.as_array().unwrap().len(), 1);

    let (status, attendant) = call(
        &app,
        Method::PUT,
        "/api/companies/company-acme/attendants/agent-1/status",
        Some(json!({ "status": "available" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(attendant["status"], "available");

    let (status, chat) = call(&app, Method::GET, "/api/chats/chat-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chat["assigned_to"], "agent-1");
    assert_eq!(chat["status"], "assigned");
    assert_eq!(chat["within_window"], true);
}

#[tokio::test]
async fn test_invalid_status_is_bad_request() {
    let h = setup().await;
    let app = build_router(h.state.clone());

    let (status, body) = call(
        &app,
        Method::PUT,
        "/api/companies/company-acme/attendants/agent-1/status",
        Some(json!({ "status": "sleeping" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("sleeping"));
}

#[tokio::test]
async fn test_unknown_chat_is_not_found() {
    let h = setup().await;
    let app = build_router(h.state.clone());

    let (status, _) = call(&app, Method::GET, "/api/chats/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, Method::POST, "/api/chats/nope/resolve", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reply_and_resolve_flow() {
    let h = setup().await;
    let app = build_router(h.state.clone());
    h.available_attendant(COMPANY, "agent-1", 2).await;

    let (_, inbound) = call(
        &app,
        Method::POST,
        "/api/companies/company-acme/chats/chat-1/inbound",
        Some(json!({})),
    )
    .await;
    assert_eq!(inbound["outcome"]["outcome"], "assigned");
    assert_eq!(inbound["outcome"]["attendant_id"], "agent-1");

    let (status, replied) = call(&app, Method::POST, "/api/chats/chat-1/outbound", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replied["status"], "active");

    let (status, resolved) = call(&app, Method::POST, "/api/chats/chat-1/resolve", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["status"], "resolved");

    let (_, attendant) = call(
        &app,
        Method::GET,
        "/api/companies/company-acme/attendants/agent-1",
        None,
    )
    .await;
    assert_eq!(attendant["active_chats"], 0);

    let (_, history) = call(&app, Method::GET, "/api/chats/chat-1/history", None).await;
    assert_eq!(history.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_strategy_and_metrics_endpoints() {
    let h = setup().await;
    let app = build_router(h.state.clone());

    let (status, settings) = call(
        &app,
        Method::PUT,
        "/api/companies/company-acme/strategy",
        Some(json!({ "strategy": "round_robin" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["strategy"], "round_robin");

    let (status, _) = call(
        &app,
        Method::PUT,
        "/api/companies/company-acme/strategy",
        Some(json!({ "strategy": "random" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, metrics) = call(&app, Method::GET, "/api/companies/company-acme/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["queue_size"], 0);
    assert_eq!(metrics["attendants_by_status"]["available"], 0);
}

#[tokio::test]
async fn test_manual_sweep_is_kept_as_last_report() {
    let h = setup().await;
    let app = build_router(h.state.clone());

    let (status, _) = call(&app, Method::GET, "/api/sweep/last", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    h.available_attendant(COMPANY, "agent-1", 3).await;
    h.clock.advance(chrono::Duration::minutes(30));

    let (status, report) = call(&app, Method::POST, "/api/sweep", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["companies"][0]["demoted"], 1);

    let (status, last) = call(&app, Method::GET, "/api/sweep/last", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(last["companies"][0]["company_id"], COMPANY);
}
