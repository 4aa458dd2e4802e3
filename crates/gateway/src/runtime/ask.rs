//! The ask pipeline: configuration gate, rate limit, upstream call, usage
//! write.
//!
//! Shared by the `/v1/ask` handler and the `ask` CLI command. Identity and
//! request validation happen before this point; everything here yields an
//! [`AskOutcome`] rather than an error, because upstream trouble is
//! reported to the caller as a normal answer-shaped response.

use std::time::Instant;

use sml_domain::config::StoreErrorPolicy;
use sml_domain::message::Message;
use sml_domain::usage::LimitWindow;
use sml_providers::ChatRequest;

use crate::runtime::rate_limit::RateVerdict;
use crate::state::AppState;

/// Answer substituted when the completion's content is missing or null.
pub const FALLBACK_ANSWER: &str = "No answer was produced, please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskOutcome {
    Answered(String),
    /// The upstream credential is not available.
    NotConfigured,
    RateLimited { window: LimitWindow, limit: u64 },
    /// Usage counts could not be read and the policy is `deny`.
    QuotaUnavailable,
    /// The upstream call failed; `status` is set for non-2xx answers.
    UpstreamFailed { status: Option<u16> },
}

impl AskOutcome {
    /// Caller-facing text for every non-answer outcome.
    pub fn error_message(&self) -> Option<String> {
        match self {
            AskOutcome::Answered(_) => None,
            AskOutcome::NotConfigured => Some("AI service is not configured".into()),
            AskOutcome::RateLimited {
                window: LimitWindow::Hourly,
                limit,
            } => Some(format!(
                "Too many questions, please try again later (limit: {limit} per hour)"
            )),
            AskOutcome::RateLimited {
                window: LimitWindow::Daily,
                limit,
            } => Some(format!(
                "Daily question limit reached, come back tomorrow (limit: {limit} per day)"
            )),
            AskOutcome::QuotaUnavailable | AskOutcome::UpstreamFailed { status: None } => {
                Some("AI service temporarily unavailable".into())
            }
            AskOutcome::UpstreamFailed {
                status: Some(status),
            } => Some(format!("AI service temporarily unavailable ({status})")),
        }
    }
}

/// Run one question for an already identified caller.
pub async fn ask(state: &AppState, caller_id: &str, question: &str) -> AskOutcome {
    let Some(assistant) = state.assistant.as_ref() else {
        tracing::error!(
            api_key_env = %state.config.upstream.api_key_env,
            "upstream API key is not set"
        );
        return AskOutcome::NotConfigured;
    };

    if let Some(limiter) = state.limiter.as_ref() {
        match limiter.check(caller_id).await {
            Ok(RateVerdict::Allowed) => {}
            Ok(RateVerdict::Denied(window)) => {
                tracing::info!(caller_id, window = %window, "question rejected by rate limit");
                return AskOutcome::RateLimited {
                    window,
                    limit: limiter.limit(window),
                };
            }
            Err(e) => match state.config.quota.on_store_error {
                StoreErrorPolicy::Allow => {
                    tracing::warn!(caller_id, error = %e, "usage count failed; allowing question");
                }
                StoreErrorPolicy::Deny => {
                    tracing::error!(caller_id, error = %e, "usage count failed; rejecting question");
                    return AskOutcome::QuotaUnavailable;
                }
            },
        }
    }

    let upstream = &state.config.upstream;
    let req = ChatRequest {
        messages: vec![
            Message::system(upstream.system_prompt.as_str()),
            Message::user(question),
        ],
        temperature: Some(upstream.temperature),
        max_tokens: Some(upstream.max_tokens),
        model: None,
    };

    let start = Instant::now();
    let resp = match assistant.chat(&req).await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::error!(
                caller_id,
                provider = assistant.provider_id(),
                question_len = question.chars().count(),
                duration_ms = start.elapsed().as_millis() as u64,
                error = %e,
                "upstream call failed"
            );
            return AskOutcome::UpstreamFailed {
                status: e.upstream_status(),
            };
        }
    };

    tracing::info!(
        caller_id,
        provider = assistant.provider_id(),
        model = %resp.model,
        question_len = question.chars().count(),
        total_tokens = resp.usage.as_ref().map(|u| u.total_tokens),
        duration_ms = start.elapsed().as_millis() as u64,
        "question answered"
    );

    if let Some(recorder) = state.recorder.as_ref() {
        recorder.record_detached(caller_id);
    }

    AskOutcome::Answered(resp.content.unwrap_or_else(|| FALLBACK_ANSWER.to_owned()))
}
