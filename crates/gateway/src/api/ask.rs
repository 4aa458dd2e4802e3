use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::Extension;
use serde_json::Value;

use crate::api::api_error;
use crate::api::auth::CallerId;
use crate::runtime::ask::{ask as run_ask, AskOutcome};
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/ask
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Answer one music question for the authenticated caller.
///
/// Rate-limit and upstream failures are answered with 200 and an `error`
/// field so the client can show them inline; only caller or deployment
/// defects use error statuses.
pub async fn ask(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerId>,
    body: Bytes,
) -> Response {
    let Some(question) = parse_question(&body) else {
        return api_error(StatusCode::BAD_REQUEST, "missing question parameter");
    };

    let outcome = run_ask(&state, caller.as_str(), &question).await;
    outcome_response(&outcome)
}

/// The `question` string from a JSON body, exactly as sent.
///
/// Only an empty string or a non-string is rejected; whitespace is passed
/// through to the upstream untouched.
fn parse_question(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let question = value.get("question")?.as_str()?;
    (!question.is_empty()).then(|| question.to_owned())
}

fn outcome_response(outcome: &AskOutcome) -> Response {
    let message = outcome.error_message().unwrap_or_default();
    match outcome {
        AskOutcome::Answered(answer) => Json(serde_json::json!({ "answer": answer })).into_response(),
        AskOutcome::NotConfigured => api_error(StatusCode::INTERNAL_SERVER_ERROR, message),
        AskOutcome::RateLimited { window, limit } => Json(serde_json::json!({
            "error": message,
            "reason": window,
            "limit": limit,
        }))
        .into_response(),
        AskOutcome::QuotaUnavailable | AskOutcome::UpstreamFailed { .. } => {
            api_error(StatusCode::OK, message)
        }
    }
}
