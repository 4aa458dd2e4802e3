//! Runs the real [`RestUsageStore`] against an in-process PostgREST stand-in
//! bound to an ephemeral port.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use sml_domain::config::StoreConfig;
use sml_domain::error::Error;
use sml_usage::{RestUsageStore, StoreCredentials, UsageStore};
use tokio::net::TcpListener;

// ── Stub table ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Seen {
    raw_query: Option<String>,
    filters: HashMap<String, String>,
    headers: HeaderMap,
    inserted: Vec<Value>,
}

#[derive(Clone)]
struct Stub {
    status: StatusCode,
    seen: Arc<Mutex<Seen>>,
}

async fn select_rows(
    State(stub): State<Stub>,
    RawQuery(raw_query): RawQuery,
    Query(filters): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    let mut seen = stub.seen.lock();
    seen.raw_query = raw_query;
    seen.filters = filters;
    seen.headers = headers;
    if stub.status.is_success() {
        (stub.status, Json(serde_json::json!([{ "id": 11 }, { "id": 12 }])))
    } else {
        (stub.status, Json(serde_json::json!({ "message": "database unavailable" })))
    }
}

async fn insert_row(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Json(row): Json<Value>,
) -> StatusCode {
    let mut seen = stub.seen.lock();
    seen.headers = headers;
    seen.inserted.push(row);
    stub.status
}

async fn start_stub(status: StatusCode) -> (StoreCredentials, Stub) {
    let stub = Stub {
        status,
        seen: Arc::default(),
    };
    let app = Router::new()
        .route("/rest/v1/ai_chat_usage", get(select_rows).post(insert_row))
        .with_state(stub.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let credentials = StoreCredentials {
        base_url: format!("http://{addr}/"),
        service_key: "service-key".into(),
    };
    (credentials, stub)
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

// ── Tests ────────────────────────────────────────────────────────────

#[tokio::test]
async fn count_sends_encoded_window_filter() {
    let (credentials, stub) = start_stub(StatusCode::OK).await;
    let store = RestUsageStore::new(&StoreConfig::default(), credentials).unwrap();
    let since = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

    let count = store.count_since("user&role=admin+1", since).await.unwrap();
    assert_eq!(count, 2);

    let seen = stub.seen.lock();
    assert_eq!(seen.filters["select"], "id");
    assert_eq!(seen.filters["user_id"], "eq.user&role=admin+1");
    assert_eq!(seen.filters["created_at"], "gte.2024-05-01T09:00:00.000Z");

    let raw = seen.raw_query.as_deref().unwrap();
    assert!(raw.contains("user_id=eq.user%26role%3Dadmin%2B1"), "{raw}");
    assert!(raw.contains("created_at=gte.2024-05-01T09%3A00%3A00.000Z"), "{raw}");

    assert_eq!(header(&seen.headers, "apikey"), Some("service-key"));
    assert_eq!(header(&seen.headers, "authorization"), Some("Bearer service-key"));
    assert!(header(&seen.headers, "x-request-id").is_some());
}

#[tokio::test]
async fn record_posts_one_row_with_minimal_return() {
    let (credentials, stub) = start_stub(StatusCode::CREATED).await;
    let store = RestUsageStore::new(&StoreConfig::default(), credentials).unwrap();

    store.record("user-7").await.unwrap();

    let seen = stub.seen.lock();
    assert_eq!(seen.inserted, vec![serde_json::json!({ "user_id": "user-7" })]);
    assert_eq!(header(&seen.headers, "prefer"), Some("return=minimal"));
}

#[tokio::test]
async fn server_errors_become_store_errors() {
    let (credentials, _stub) = start_stub(StatusCode::INTERNAL_SERVER_ERROR).await;
    let store = RestUsageStore::new(&StoreConfig::default(), credentials).unwrap();

    let err = store.count_since("user-7", Utc::now()).await.unwrap_err();
    match err {
        Error::Store(message) => {
            assert!(message.contains("500"), "{message}");
            assert!(message.contains("database unavailable"), "{message}");
        }
        other => panic!("expected a store error, got {other:?}"),
    }

    let err = store.record("user-7").await.unwrap_err();
    assert!(matches!(err, Error::Store(_)), "got {err:?}");
}
