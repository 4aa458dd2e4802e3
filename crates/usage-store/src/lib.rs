//! `sml-usage`: usage-log client for the music assistant proxy.
//!
//! Provides the [`UsageStore`] trait consulted by the rate limiter, a
//! PostgREST implementation ([`RestUsageStore`]) for the hosted database,
//! and a process-local [`MemoryUsageStore`].
//!
//! # Quick start
//!
//! ```rust,no_run
//! use sml_domain::config::StoreConfig;
//! use sml_usage::{create_store, UsageStore};
//!
//! # async fn example() -> sml_domain::error::Result<()> {
//! if let Some(store) = create_store(&StoreConfig::default())? {
//!     let since = chrono::Utc::now() - chrono::TimeDelta::hours(1);
//!     let calls = store.count_since("user-42", since).await?;
//!     println!("user-42 asked {calls} question(s) in the last hour");
//! }
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod rest;
pub mod store;

pub use memory::MemoryUsageStore;
pub use rest::{RestUsageStore, StoreCredentials};
pub use store::UsageStore;

use std::sync::Arc;

use sml_domain::config::StoreConfig;
use sml_domain::error::Result;

/// Build the usage store named by `cfg`, reading credentials from the
/// environment.
///
/// Returns `Ok(None)` when the store URL or the service key is not set:
/// the gateway then serves questions without per-caller limits.
pub fn create_store(cfg: &StoreConfig) -> Result<Option<Arc<dyn UsageStore>>> {
    let Some(credentials) = StoreCredentials::from_env(cfg) else {
        tracing::warn!(
            url_env = %cfg.url_env,
            service_key_env = %cfg.service_key_env,
            "usage store not configured; per-caller rate limiting disabled"
        );
        return Ok(None);
    };

    let store = RestUsageStore::new(cfg, credentials)?;
    tracing::info!(
        url = %store.base_url(),
        table = %cfg.table,
        "usage store ready"
    );
    Ok(Some(Arc::new(store)))
}
