//! Detached usage-log writes.
//!
//! A successful answer is returned to the caller before its usage record is
//! written. Writes run on spawned tasks tracked by a [`TaskTracker`] so the
//! server can wait for them on shutdown.

use std::sync::Arc;
use std::time::Duration;

use sml_usage::UsageStore;
use tokio_util::task::TaskTracker;

#[derive(Clone)]
pub struct UsageRecorder {
    store: Arc<dyn UsageStore>,
    tasks: TaskTracker,
}

impl UsageRecorder {
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self {
            store,
            tasks: TaskTracker::new(),
        }
    }

    /// Spawn the write for `caller_id` and return immediately.
    ///
    /// Failures are logged and otherwise dropped.
    pub fn record_detached(&self, caller_id: &str) {
        let store = self.store.clone();
        let caller_id = caller_id.to_owned();
        self.tasks.spawn(async move {
            if let Err(e) = store.record(&caller_id).await {
                tracing::warn!(error = %e, "failed to record usage");
            }
        });
    }

    /// Number of writes still in flight.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Wait up to `timeout` for in-flight writes. Returns `false` if some
    /// were still running when the timeout elapsed.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tasks.close();
        let pending = self.tasks.len();
        if pending > 0 {
            tracing::info!(pending, "waiting for usage writes");
        }
        match tokio::time::timeout(timeout, self.tasks.wait()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    pending = self.tasks.len(),
                    timeout_ms = timeout.as_millis() as u64,
                    "usage writes still pending at shutdown"
                );
                false
            }
        }
    }
}
