use std::sync::Arc;

use sml_domain::config::Config;
use sml_providers::LlmProvider;

use crate::runtime::rate_limit::RateLimiter;
use crate::runtime::usage::UsageRecorder;

/// Shared application state passed to all API handlers.
///
/// Built once at startup by [`crate::bootstrap::build_app_state`], or by
/// hand in tests with fake collaborators.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// `None` when the upstream API key is not set.
    pub assistant: Option<Arc<dyn LlmProvider>>,
    /// `None` when the usage store is not configured.
    pub limiter: Option<Arc<RateLimiter>>,
    pub recorder: Option<UsageRecorder>,
}

impl AppState {
    pub fn rate_limit_enabled(&self) -> bool {
        self.limiter.is_some()
    }
}
