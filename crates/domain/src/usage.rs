//! Usage-log types backing the per-caller rate limit.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// One successful upstream call, as stored in the usage-log table.
///
/// Records are append-only: nothing in this workspace updates or deletes
/// them. Retention is handled by the store's owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Subject claim of the caller's session token (`user_id` column).
    #[serde(rename = "user_id")]
    pub caller_id: String,
    /// Insert time, assigned by the store.
    pub created_at: DateTime<Utc>,
}

/// A trailing rate-limit window ending at "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitWindow {
    Hourly,
    Daily,
}

impl LimitWindow {
    /// Windows in evaluation order.
    pub const ALL: [LimitWindow; 2] = [LimitWindow::Hourly, LimitWindow::Daily];

    pub fn span(self) -> TimeDelta {
        match self {
            LimitWindow::Hourly => TimeDelta::hours(1),
            LimitWindow::Daily => TimeDelta::hours(24),
        }
    }

    /// Inclusive lower bound of the window for a check performed at `now`.
    pub fn start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.span()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LimitWindow::Hourly => "hourly",
            LimitWindow::Daily => "daily",
        }
    }
}

impl std::fmt::Display for LimitWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calls made within one window, against its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowUsage {
    pub used: u64,
    pub limit: u64,
}

impl WindowUsage {
    pub fn exhausted(&self) -> bool {
        self.used >= self.limit
    }
}

/// Snapshot of a caller's usage in both windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub hourly: WindowUsage,
    pub daily: WindowUsage,
}
