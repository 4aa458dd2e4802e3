//! Per-caller two-window sliding rate limit.
//!
//! Counts are read from the usage log on every check; the limiter itself
//! holds no per-caller state. The check and the later usage write are not
//! atomic, so concurrent requests from one caller can briefly exceed the
//! nominal limits.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sml_domain::config::QuotaConfig;
use sml_domain::error::Result;
use sml_domain::usage::{LimitWindow, QuotaStatus, WindowUsage};
use sml_usage::UsageStore;

/// Outcome of a limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateVerdict {
    Allowed,
    /// The named window is exhausted.
    Denied(LimitWindow),
}

impl RateVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateVerdict::Allowed)
    }
}

pub struct RateLimiter {
    store: Arc<dyn UsageStore>,
    hourly_limit: u64,
    daily_limit: u64,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn UsageStore>, quota: &QuotaConfig) -> Self {
        Self {
            store,
            hourly_limit: quota.hourly_limit,
            daily_limit: quota.daily_limit,
        }
    }

    pub fn limit(&self, window: LimitWindow) -> u64 {
        match window {
            LimitWindow::Hourly => self.hourly_limit,
            LimitWindow::Daily => self.daily_limit,
        }
    }

    pub async fn check(&self, caller_id: &str) -> Result<RateVerdict> {
        self.check_at(caller_id, Utc::now()).await
    }

    /// Decide whether `caller_id` may make another call at `now`.
    ///
    /// Windows are evaluated in [`LimitWindow::ALL`] order and the first
    /// exhausted one is reported; later windows are not queried. A count
    /// that cannot be completed is returned as an error.
    pub async fn check_at(&self, caller_id: &str, now: DateTime<Utc>) -> Result<RateVerdict> {
        for window in LimitWindow::ALL {
            let usage = self.window_usage(caller_id, window, now).await?;
            if usage.exhausted() {
                tracing::debug!(
                    window = %window,
                    used = usage.used,
                    limit = usage.limit,
                    "rate limit reached"
                );
                return Ok(RateVerdict::Denied(window));
            }
        }
        Ok(RateVerdict::Allowed)
    }

    /// Both window counts for `caller_id`, without short-circuiting.
    pub async fn usage(&self, caller_id: &str) -> Result<QuotaStatus> {
        let now = Utc::now();
        Ok(QuotaStatus {
            hourly: self.window_usage(caller_id, LimitWindow::Hourly, now).await?,
            daily: self.window_usage(caller_id, LimitWindow::Daily, now).await?,
        })
    }

    async fn window_usage(
        &self,
        caller_id: &str,
        window: LimitWindow,
        now: DateTime<Utc>,
    ) -> Result<WindowUsage> {
        let used = self.store.count_since(caller_id, window.start(now)).await?;
        Ok(WindowUsage {
            used,
            limit: self.limit(window),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use sml_usage::MemoryUsageStore;

    fn limiter(store: &Arc<MemoryUsageStore>) -> RateLimiter {
        RateLimiter::new(store.clone(), &QuotaConfig::default())
    }

    /// `n` records spread over the last `span_minutes`, all inside it.
    fn seed(store: &MemoryUsageStore, caller: &str, now: DateTime<Utc>, n: usize, span_minutes: i64) {
        for i in 0..n {
            let offset = span_minutes * 60_000 * (i as i64 + 1) / (n as i64 + 1);
            store.insert_at(caller, now - TimeDelta::milliseconds(offset));
        }
    }

    #[tokio::test]
    async fn fresh_caller_is_allowed() {
        let store = Arc::new(MemoryUsageStore::new());
        let verdict = limiter(&store).check_at("u1", Utc::now()).await.unwrap();
        assert_eq!(verdict, RateVerdict::Allowed);
    }

    #[tokio::test]
    async fn hourly_threshold_is_exact() {
        let now = Utc::now();
        for hourly in 0..=12usize {
            let store = Arc::new(MemoryUsageStore::new());
            seed(&store, "u1", now, hourly, 59);
            let verdict = limiter(&store).check_at("u1", now).await.unwrap();
            if hourly < 10 {
                assert_eq!(verdict, RateVerdict::Allowed, "hourly={hourly}");
            } else {
                assert_eq!(verdict, RateVerdict::Denied(LimitWindow::Hourly), "hourly={hourly}");
            }
        }
    }

    #[tokio::test]
    async fn daily_threshold_is_exact() {
        let now = Utc::now();
        for daily in 25..=32usize {
            let store = Arc::new(MemoryUsageStore::new());
            // Everything older than an hour so only the daily window sees it.
            for i in 0..daily {
                store.insert_at("u1", now - TimeDelta::hours(2) - TimeDelta::minutes(i as i64 * 30));
            }
            let verdict = limiter(&store).check_at("u1", now).await.unwrap();
            if daily < 30 {
                assert_eq!(verdict, RateVerdict::Allowed, "daily={daily}");
            } else {
                assert_eq!(verdict, RateVerdict::Denied(LimitWindow::Daily), "daily={daily}");
            }
        }
    }

    #[tokio::test]
    async fn hourly_denial_skips_daily_query() {
        let now = Utc::now();
        let store = Arc::new(MemoryUsageStore::new());
        seed(&store, "u1", now, 30, 59);

        let verdict = limiter(&store).check_at("u1", now).await.unwrap();
        assert_eq!(verdict, RateVerdict::Denied(LimitWindow::Hourly));
        assert_eq!(store.count_queries(), 1);
    }

    #[tokio::test]
    async fn nine_hourly_and_twenty_nine_daily_is_allowed() {
        let now = Utc::now();
        let store = Arc::new(MemoryUsageStore::new());
        seed(&store, "u1", now, 9, 59);
        for i in 0..20 {
            store.insert_at("u1", now - TimeDelta::hours(2) - TimeDelta::minutes(i * 45));
        }

        let verdict = limiter(&store).check_at("u1", now).await.unwrap();
        assert!(verdict.is_allowed());
        assert_eq!(store.count_queries(), 2);
    }

    #[tokio::test]
    async fn records_outside_both_windows_are_ignored() {
        let now = Utc::now();
        let store = Arc::new(MemoryUsageStore::new());
        for i in 0..50 {
            store.insert_at("u1", now - TimeDelta::hours(25) - TimeDelta::minutes(i));
        }
        let verdict = limiter(&store).check_at("u1", now).await.unwrap();
        assert!(verdict.is_allowed());
    }

    #[tokio::test]
    async fn other_callers_do_not_count() {
        let now = Utc::now();
        let store = Arc::new(MemoryUsageStore::new());
        seed(&store, "someone-else", now, 40, 59);
        let verdict = limiter(&store).check_at("u1", now).await.unwrap();
        assert!(verdict.is_allowed());
    }

    #[tokio::test]
    async fn store_failure_is_an_error_not_an_allow() {
        let store = Arc::new(MemoryUsageStore::new());
        store.set_unavailable(true);
        assert!(limiter(&store).check_at("u1", Utc::now()).await.is_err());
    }

    #[tokio::test]
    async fn usage_reports_both_windows() {
        let now = Utc::now();
        let store = Arc::new(MemoryUsageStore::new());
        seed(&store, "u1", now, 4, 59);
        store.insert_at("u1", now - TimeDelta::hours(5));

        let status = limiter(&store).usage("u1").await.unwrap();
        assert_eq!(status.hourly, WindowUsage { used: 4, limit: 10 });
        assert_eq!(status.daily, WindowUsage { used: 5, limit: 30 });
    }
}
