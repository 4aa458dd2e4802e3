//! `sml-assistant ask`: one question through the same pipeline as
//! `POST /v1/ask`, without the HTTP layer.
//!
//! The caller identity is taken from `--caller` instead of a token.

use std::sync::Arc;
use std::time::Duration;

use sml_domain::config::Config;

use crate::bootstrap;
use crate::runtime::ask::{ask as run_ask, AskOutcome};

/// Ask one question and print the answer or the caller-facing error.
///
/// Exits the process with code 1 for anything but an answer.
pub async fn run(
    config: Arc<Config>,
    question: String,
    caller: String,
    json_output: bool,
) -> anyhow::Result<()> {
    if question.is_empty() {
        anyhow::bail!("question must not be empty");
    }
    let caller = caller.trim();
    if caller.is_empty() {
        anyhow::bail!("--caller must not be empty");
    }

    let drain = Duration::from_millis(config.server.shutdown_drain_ms);
    let state = bootstrap::build_app_state(config)?;
    let outcome = run_ask(&state, caller, &question).await;

    // Let the usage write land before the runtime shuts down.
    if let Some(recorder) = state.recorder.as_ref() {
        recorder.drain(drain).await;
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&outcome_json(&outcome))?);
    } else {
        match &outcome {
            AskOutcome::Answered(answer) => println!("{answer}"),
            other => eprintln!("error: {}", other.error_message().unwrap_or_default()),
        }
    }

    if !matches!(outcome, AskOutcome::Answered(_)) {
        std::process::exit(1);
    }
    Ok(())
}

fn outcome_json(outcome: &AskOutcome) -> serde_json::Value {
    match outcome {
        AskOutcome::Answered(answer) => serde_json::json!({ "answer": answer }),
        AskOutcome::RateLimited { window, limit } => serde_json::json!({
            "error": outcome.error_message(),
            "reason": window,
            "limit": limit,
        }),
        other => serde_json::json!({ "error": other.error_message() }),
    }
}
