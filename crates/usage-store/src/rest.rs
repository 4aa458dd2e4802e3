//! PostgREST implementation of [`UsageStore`].
//!
//! `RestUsageStore` wraps a `reqwest::Client` and talks to the usage-log
//! table through the hosted database's REST interface, authenticating with
//! the service-role key. Every call is a single attempt bounded by the
//! client timeout; there is no retry.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Response};
use sml_domain::config::StoreConfig;
use sml_domain::error::{Error, Result};
use uuid::Uuid;

use crate::store::UsageStore;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Credentials
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Store base URL plus the privileged key used for usage-log access.
#[derive(Clone)]
pub struct StoreCredentials {
    pub base_url: String,
    pub service_key: String,
}

impl std::fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("base_url", &self.base_url)
            .field("service_key", &"<redacted>")
            .finish()
    }
}

impl StoreCredentials {
    /// Read both values from the environment variables named in `cfg`.
    /// Returns `None` if either is unset or blank.
    pub fn from_env(cfg: &StoreConfig) -> Option<Self> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };
        Some(Self {
            base_url: read(&cfg.url_env)?,
            service_key: read(&cfg.service_key_env)?,
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A REST client for the usage-log table.
///
/// Created once at startup and shared; the underlying `reqwest::Client`
/// maintains a connection pool.
#[derive(Clone)]
pub struct RestUsageStore {
    http: Client,
    base_url: String,
    service_key: String,
    table: String,
}

impl std::fmt::Debug for RestUsageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestUsageStore")
            .field("base_url", &self.base_url)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl RestUsageStore {
    pub fn new(cfg: &StoreConfig, credentials: StoreCredentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            http,
            base_url: credentials.base_url.trim_end_matches('/').to_owned(),
            service_key: credentials.service_key,
            table: cfg.table.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ── request helpers ──────────────────────────────────────────────

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    /// Attach the service-role credentials and a request id.
    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("X-Request-Id", Uuid::new_v4().to_string())
    }

    /// Send once and turn any non-2xx status into [`Error::Store`].
    async fn execute(&self, endpoint: &str, rb: RequestBuilder) -> Result<Response> {
        let start = Instant::now();
        let result = self.decorate(rb).send().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                tracing::debug!(endpoint, duration_ms, error = %e, "usage store call failed");
                return Err(transport_error(e));
            }
        };

        let status = resp.status();
        tracing::debug!(endpoint, status = status.as_u16(), duration_ms, "usage store call");

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Store(format!(
                "{endpoint} returned {}: {body}",
                status.as_u16()
            )));
        }
        Ok(resp)
    }
}

/// PostgREST filter for "rows of `caller_id` created at or after `since`".
pub(crate) fn window_query(caller_id: &str, since: DateTime<Utc>) -> [(&'static str, String); 3] {
    [
        ("select", "id".to_owned()),
        ("user_id", format!("eq.{caller_id}")),
        (
            "created_at",
            format!("gte.{}", since.to_rfc3339_opts(SecondsFormat::Millis, true)),
        ),
    ]
}

/// Number of rows in a PostgREST select response.
pub(crate) fn count_rows(body: &str) -> Result<u64> {
    let rows: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| Error::Store(format!("failed to parse count response: {e}")))?;
    rows.as_array()
        .map(|a| a.len() as u64)
        .ok_or_else(|| Error::Store("count response is not a JSON array".into()))
}

fn transport_error(e: reqwest::Error) -> Error {
    Error::transport(e.is_timeout(), e)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl UsageStore for RestUsageStore {
    async fn count_since(&self, caller_id: &str, since: DateTime<Utc>) -> Result<u64> {
        let rb = self
            .http
            .get(self.table_url())
            .query(&window_query(caller_id, since));
        let resp = self.execute("GET usage window", rb).await?;

        let body = resp.text().await.map_err(transport_error)?;
        count_rows(&body)
    }

    async fn record(&self, caller_id: &str) -> Result<()> {
        let rb = self
            .http
            .post(self.table_url())
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "user_id": caller_id }));
        self.execute("POST usage record", rb).await?;
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
