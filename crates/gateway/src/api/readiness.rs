use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};

use crate::state::AppState;

/// `GET /v1/readiness`, used by health probes.
///
/// Ready means questions can be answered, i.e. the upstream key is set.
/// Rate limiting being off does not make the service unready.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let upstream_configured = state.assistant.is_some();
    let status = if upstream_configured {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "ready": upstream_configured,
            "upstream_configured": upstream_configured,
            "rate_limit_enabled": state.rate_limit_enabled(),
        })),
    )
}
