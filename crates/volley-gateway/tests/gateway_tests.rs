// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests of the gateway routes against in-memory adapters.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;
use volley_bench::{BatchOrchestrator, OrchestratorSettings};
use volley_core::{BatchId, GenerationConfig, HistoryRecord};
use volley_gateway::{GatewayState, router};
use volley_test_utils::{MemoryStore, MockReply, MockTransport};

struct Harness {
    state: GatewayState,
    store: Arc<MemoryStore>,
    transport: Arc<MockTransport>,
}

fn harness(transport: MockTransport) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(transport);
    let orchestrator = BatchOrchestrator::new(
        transport.clone(),
        store.clone(),
        OrchestratorSettings {
            stagger: Duration::ZERO,
        },
    );
    Harness {
        state: GatewayState::new(store.clone(), orchestrator),
        store,
        transport,
    }
}

async fn call(state: &GatewayState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn wait_for_idle(state: &GatewayState) {
    if let Some(batch) = state.orchestrator.current() {
        batch.finalized().await;
    }
}

#[tokio::test]
async fn health_endpoints_respond() {
    let h = harness(MockTransport::new());
    for uri in ["/health", "/api/health"] {
        let (status, body) = call(&h.state, "GET", uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}

#[tokio::test]
async fn prompt_library_round_trip() {
    let h = harness(MockTransport::new());

    let (status, list) = call(
        &h.state,
        "POST",
        "/api/prompts/system",
        Some(json!({"id": "p1", "title": "Terse", "content": "Be brief.", "createdAt": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["type"], "system");

    let (_, list) = call(&h.state, "PATCH", "/api/prompts/system/p1/title", Some(json!({"title": "Short"}))).await;
    assert_eq!(list[0]["title"], "Short");

    let (_, list) = call(&h.state, "PATCH", "/api/prompts/system/p1/favorite", None).await;
    assert_eq!(list[0]["isFavorite"], true);

    // Kinds are separate libraries.
    let (_, user) = call(&h.state, "GET", "/api/prompts/user", None).await;
    assert_eq!(user, json!([]));

    let (_, list) = call(&h.state, "DELETE", "/api/prompts/system/p1", None).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn unknown_prompt_kind_is_rejected() {
    let h = harness(MockTransport::new());
    let (status, _) = call(&h.state, "GET", "/api/prompts/assistant", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn history_post_is_idempotent() {
    let h = harness(MockTransport::new());
    let record = HistoryRecord::from_slots(
        BatchId("run-1".into()),
        "sys",
        "user",
        &GenerationConfig::default(),
        &[],
    );
    let body = serde_json::to_value(&record).unwrap();

    let (status, reply) = call(&h.state, "POST", "/api/history", Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, json!({"success": true}));
    call(&h.state, "POST", "/api/history", Some(body)).await;

    let (_, list) = call(&h.state, "GET", "/api/history", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (_, list) = call(&h.state, "PATCH", "/api/history/run-1/favorite", None).await;
    assert_eq!(list[0]["isFavorite"], true);

    let (_, list) = call(&h.state, "DELETE", "/api/history/run-1", None).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn store_failure_maps_to_500() {
    let h = harness(MockTransport::new());
    h.store.fail_inserts(true);
    let record = HistoryRecord::from_slots(BatchId("x".into()), "s", "u", &GenerationConfig::default(), &[]);

    let (status, body) = call(&h.state, "POST", "/api/history", Some(serde_json::to_value(&record).unwrap())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("injected"));
}

#[tokio::test]
async fn api_key_settings() {
    let h = harness(MockTransport::new());
    let (_, body) = call(&h.state, "GET", "/api/settings/api-key", None).await;
    assert_eq!(body, json!({"apiKey": null}));

    let (_, reply) = call(&h.state, "POST", "/api/settings/api-key", Some(json!({"apiKey": "sk-1"}))).await;
    assert_eq!(reply["success"], true);

    let (_, body) = call(&h.state, "GET", "/api/settings/api-key", None).await;
    assert_eq!(body["apiKey"], "sk-1");
}

#[tokio::test]
async fn run_lifecycle_commits_history_with_stored_key() {
    let h = harness(MockTransport::new().default_reply(MockReply::tokens(["O", "K"])));
    call(&h.state, "POST", "/api/settings/api-key", Some(json!({"apiKey": "sk-stored"}))).await;

    let (status, body) = call(
        &h.state,
        "POST",
        "/api/runs",
        Some(json!({"systemPrompt": "sys", "userPrompt": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let id = body["id"].as_str().unwrap().to_string();

    wait_for_idle(&h.state).await;

    let (_, history) = call(&h.state, "GET", "/api/history", None).await;
    assert_eq!(history[0]["id"], id.as_str());
    assert_eq!(history[0]["results"].as_array().unwrap().len(), 4);
    assert_eq!(history[0]["results"][0]["content"], "OK");

    let requests = h.transport.requests().await;
    assert!(requests.iter().all(|r| r.credential.as_deref() == Some("sk-stored")));

    let (_, current) = call(&h.state, "GET", "/api/runs/current", None).await;
    assert_eq!(current["phase"], "idle");
}

#[tokio::test]
async fn run_rejections() {
    let h = harness(MockTransport::new().default_reply(MockReply::Hang));

    let (status, body) = call(&h.state, "POST", "/api/runs", Some(json!({"systemPrompt": " ", "userPrompt": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("empty"));

    let mut config = serde_json::to_value(GenerationConfig::default()).unwrap();
    config["temperature"] = json!(5.0);
    let (status, _) = call(
        &h.state,
        "POST",
        "/api/runs",
        Some(json!({"systemPrompt": "s", "userPrompt": "u", "config": config})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let run = json!({"systemPrompt": "s", "userPrompt": "u"});
    let (status, _) = call(&h.state, "POST", "/api/runs", Some(run.clone())).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let (status, _) = call(&h.state, "POST", "/api/runs", Some(run)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, current) = call(&h.state, "GET", "/api/runs/current", None).await;
    assert_eq!(current["phase"], "running");
    assert_eq!(current["slots"].as_array().unwrap().len(), 4);

    let (_, body) = call(&h.state, "POST", "/api/runs/abort", None).await;
    assert_eq!(body["aborted"], true);
    wait_for_idle(&h.state).await;

    let (_, body) = call(&h.state, "POST", "/api/runs/abort", None).await;
    assert_eq!(body["aborted"], false);
}

#[tokio::test]
async fn events_stream_ends_with_done() {
    let h = harness(MockTransport::new().default_reply(MockReply::Hang));

    let (status, _) = call(&h.state, "GET", "/api/runs/current/events", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    call(&h.state, "POST", "/api/runs", Some(json!({"systemPrompt": "s", "userPrompt": "u"}))).await;
    let request = Request::builder()
        .uri("/api/runs/current/events")
        .body(Body::empty())
        .unwrap();
    let response = router(h.state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    let orchestrator = h.state.orchestrator.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        orchestrator.abort();
    });

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with("event: snapshot"));
    assert!(text.contains("event: done"));
    assert!(text.contains("\"committed\":true"));
}
