//! Runs the real [`OpenAiCompatProvider`] against an in-process completion
//! endpoint bound to an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::Value;
use sml_domain::config::UpstreamConfig;
use sml_domain::error::Error;
use sml_domain::message::Message;
use sml_providers::{ChatRequest, LlmProvider, OpenAiCompatProvider};
use tokio::net::TcpListener;

// ── Stub endpoint ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Seen {
    authorization: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct Stub {
    status: StatusCode,
    reply: Value,
    delay: Duration,
    seen: Arc<Mutex<Option<Seen>>>,
}

async fn completions(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    *stub.seen.lock() = Some(Seen {
        authorization,
        body,
    });
    tokio::time::sleep(stub.delay).await;
    (stub.status, Json(stub.reply))
}

async fn start_stub(status: StatusCode, reply: Value, delay: Duration) -> (SocketAddr, Stub) {
    let stub = Stub {
        status,
        reply,
        delay,
        seen: Arc::default(),
    };
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(stub.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, stub)
}

fn provider_for(addr: SocketAddr, timeout_ms: u64) -> OpenAiCompatProvider {
    let cfg = UpstreamConfig {
        base_url: format!("http://{addr}/v1"),
        timeout_ms,
        ..UpstreamConfig::default()
    };
    OpenAiCompatProvider::from_config(&cfg, "sk-local".into()).unwrap()
}

fn question(text: &str) -> ChatRequest {
    ChatRequest {
        messages: vec![Message::system("music only"), Message::user(text)],
        temperature: Some(0.7),
        max_tokens: Some(512),
        model: None,
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[tokio::test]
async fn answer_is_read_from_the_first_choice() {
    let reply = serde_json::json!({
        "model": "qwen-turbo",
        "choices": [{ "message": { "role": "assistant", "content": "Puccini." } }],
    });
    let (addr, stub) = start_stub(StatusCode::OK, reply, Duration::ZERO).await;

    let resp = provider_for(addr, 5_000)
        .chat(&question("Who wrote Tosca?"))
        .await
        .unwrap();
    assert_eq!(resp.content.as_deref(), Some("Puccini."));

    let seen = stub.seen.lock().clone().unwrap();
    assert_eq!(seen.authorization.as_deref(), Some("Bearer sk-local"));
    assert_eq!(seen.body["model"], "qwen-turbo");
    assert_eq!(seen.body["max_tokens"], 512);
    assert_eq!(seen.body["messages"][1]["content"], "Who wrote Tosca?");
}

#[tokio::test]
async fn non_success_status_is_reported_with_its_code() {
    let (addr, _stub) = start_stub(
        StatusCode::SERVICE_UNAVAILABLE,
        serde_json::json!({ "message": "overloaded" }),
        Duration::ZERO,
    )
    .await;

    let err = provider_for(addr, 5_000)
        .chat(&question("Who wrote Tosca?"))
        .await
        .unwrap_err();
    assert_eq!(err.upstream_status(), Some(503));
    assert!(err.to_string().contains("overloaded"));
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let (addr, _stub) =
        start_stub(StatusCode::OK, serde_json::json!({}), Duration::from_secs(2)).await;

    let err = provider_for(addr, 100)
        .chat(&question("Who wrote Tosca?"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(_)), "got {err:?}");
    assert_eq!(err.upstream_status(), None);
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = provider_for(addr, 5_000)
        .chat(&question("Who wrote Tosca?"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Http(_)), "got {err:?}");
    assert_eq!(err.upstream_status(), None);
}
