use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::Extension;

use crate::api::api_error;
use crate::api::auth::CallerId;
use crate::state::AppState;

/// `GET /v1/quota`: the caller's usage in both windows.
///
/// Answers `{"enabled": false}` when no usage store is configured.
pub async fn quota(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerId>,
) -> Response {
    let Some(limiter) = state.limiter.as_ref() else {
        return Json(serde_json::json!({ "enabled": false })).into_response();
    };

    match limiter.usage(caller.as_str()).await {
        Ok(status) => Json(serde_json::json!({
            "enabled": true,
            "hourly": status.hourly,
            "daily": status.daily,
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!(caller_id = caller.as_str(), error = %e, "quota lookup failed");
            api_error(StatusCode::SERVICE_UNAVAILABLE, "usage information unavailable")
        }
    }
}
