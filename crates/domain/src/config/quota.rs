use serde::{Deserialize, Serialize};

/// Per-caller sliding-window limits on proxied questions.
///
/// A caller is denied once the number of recorded calls in the trailing
/// hour reaches `hourly_limit`, or in the trailing 24 hours reaches
/// `daily_limit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    #[serde(default = "d_hourly")]
    pub hourly_limit: u64,
    #[serde(default = "d_daily")]
    pub daily_limit: u64,
    /// What to do when the usage log cannot be read.
    #[serde(default)]
    pub on_store_error: StoreErrorPolicy,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            hourly_limit: d_hourly(),
            daily_limit: d_daily(),
            on_store_error: StoreErrorPolicy::default(),
        }
    }
}

/// Policy applied when a window count cannot be completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreErrorPolicy {
    /// Let the question through and log a warning.
    #[default]
    Allow,
    /// Refuse with a soft "temporarily unavailable" answer.
    Deny,
}

fn d_hourly() -> u64 {
    10
}
fn d_daily() -> u64 {
    30
}
