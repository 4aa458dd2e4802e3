//! The `UsageStore` trait defines the interface for every usage-log
//! backend (PostgREST, in-memory, test doubles).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sml_domain::error::Result;

/// Append-only log of successful upstream calls, keyed by caller.
///
/// Records are never updated or deleted.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Number of records for `caller_id` with `created_at >= since`.
    async fn count_since(&self, caller_id: &str, since: DateTime<Utc>) -> Result<u64>;

    /// Append one record for `caller_id`. The store assigns `created_at`.
    async fn record(&self, caller_id: &str) -> Result<()>;
}
