//! AppState construction shared by `serve`, `doctor` and `ask`.

use std::sync::Arc;

use anyhow::Context;

use sml_domain::config::{Config, ConfigSeverity};
use sml_domain::error::Error;
use sml_providers::{resolve_api_key, LlmProvider, OpenAiCompatProvider};
use sml_usage::{create_store, UsageStore};

use crate::runtime::rate_limit::RateLimiter;
use crate::runtime::usage::UsageRecorder;
use crate::state::AppState;

/// Validate config, initialize the upstream client and usage store, and
/// return a fully-wired [`AppState`].
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let error_count = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if error_count > 0 {
        anyhow::bail!("config validation failed with {error_count} error(s)");
    }

    // ── Upstream completion client ───────────────────────────────────
    let assistant = build_assistant(&config)?;

    // ── Usage store, limiter, recorder ───────────────────────────────
    let store = create_store(&config.store).context("creating usage store")?;

    Ok(with_store(config, assistant, store))
}

/// The upstream client, or `None` when its API key is not set.
///
/// A missing key is not a startup failure: `/v1/ask` answers 500 until the
/// key is provided and the process restarted.
pub fn build_assistant(config: &Config) -> anyhow::Result<Option<Arc<dyn LlmProvider>>> {
    let upstream = &config.upstream;
    match resolve_api_key(&upstream.api_key_env) {
        Ok(key) => {
            let provider = OpenAiCompatProvider::from_config(upstream, key)
                .context("initializing upstream client")?;
            tracing::info!(
                provider = %upstream.id,
                base_url = %upstream.base_url,
                model = %upstream.model,
                "upstream client ready"
            );
            Ok(Some(Arc::new(provider)))
        }
        Err(Error::Auth(msg)) => {
            tracing::warn!(
                api_key_env = %upstream.api_key_env,
                "{msg}; questions will be refused until it is set"
            );
            Ok(None)
        }
        Err(e) => Err(e).context("resolving upstream API key"),
    }
}

/// Wire an [`AppState`] from already-built collaborators.
pub fn with_store(
    config: Arc<Config>,
    assistant: Option<Arc<dyn LlmProvider>>,
    store: Option<Arc<dyn UsageStore>>,
) -> AppState {
    let (limiter, recorder) = match store {
        Some(store) => {
            tracing::info!(
                hourly_limit = config.quota.hourly_limit,
                daily_limit = config.quota.daily_limit,
                on_store_error = ?config.quota.on_store_error,
                "per-caller rate limiting enabled"
            );
            (
                Some(Arc::new(RateLimiter::new(store.clone(), &config.quota))),
                Some(UsageRecorder::new(store)),
            )
        }
        None => (None, None),
    };

    AppState {
        config,
        assistant,
        limiter,
        recorder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sml_usage::MemoryUsageStore;

    #[test]
    fn store_enables_limiter_and_recorder() {
        let store: Arc<dyn UsageStore> = Arc::new(MemoryUsageStore::new());
        let state = with_store(Arc::new(Config::default()), None, Some(store));
        assert!(state.rate_limit_enabled());
        assert!(state.recorder.is_some());
    }

    #[test]
    fn no_store_disables_limiting() {
        let state = with_store(Arc::new(Config::default()), None, None);
        assert!(!state.rate_limit_enabled());
        assert!(state.recorder.is_none());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = Config::default();
        config.quota.hourly_limit = 0;
        let err = build_app_state(Arc::new(config)).err().expect("should fail");
        assert!(err.to_string().contains("1 error(s)"));
    }

    #[test]
    fn missing_upstream_key_is_not_fatal() {
        let mut config = Config::default();
        config.upstream.api_key_env = "SML_TEST_UNSET_UPSTREAM_KEY_7781".into();
        let assistant = build_assistant(&config).unwrap();
        assert!(assistant.is_none());
    }
}
