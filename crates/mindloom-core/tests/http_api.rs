//! HTTP surface: synchronous validation and handle polling.

mod support;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use mindloom_core::http::build_router;
use mindloom_core::providers::ProviderRegistry;
use serde_json::{Value, json};
use support::build_core;
use tower::ServiceExt;

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let fixture = build_core(ProviderRegistry::default());
    let app = build_router(fixture.core.clone());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_chat_rejects_missing_question_before_any_work() {
    let fixture = build_core(ProviderRegistry::default());
    let app = build_router(fixture.core.clone());

    let response = app
        .oneshot(json_request(
            "/api/chat",
            json!({ "account_id": "acct-1", "session_id": "room-1", "question": "  " }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("question")
    );
}

#[tokio::test]
async fn test_broadcast_rejects_when_no_providers() {
    let fixture = build_core(ProviderRegistry::default());
    let app = build_router(fixture.core.clone());

    let response = app
        .oneshot(json_request(
            "/api/chat/broadcast",
            json!({ "question": "hello" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_job_is_404() {
    let fixture = build_core(ProviderRegistry::default());
    let app = build_router(fixture.core.clone());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/jobs/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_memory_endpoint_returns_empty_document_for_new_session() {
    let fixture = build_core(ProviderRegistry::default());
    let app = build_router(fixture.core.clone());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/sessions/room-9/memory")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["session_id"], "room-9");
    assert_eq!(body["messages"], json!([]));
}

#[tokio::test]
async fn test_clear_memory_reports_whether_session_existed() {
    let fixture = build_core(ProviderRegistry::default());
    fixture
        .core
        .memory
        .append("room-1", mindloom_core::models::MessageRole::User, "hi")
        .unwrap();
    let app = build_router(fixture.core.clone());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/sessions/room-1/memory")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(response).await["cleared"], json!(true));

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/sessions/room-1/memory")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(response).await["cleared"], json!(false));
}
