pub mod ask;
pub mod auth;
pub mod quota;
pub mod readiness;

use std::any::Any;

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Method, Request, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use sml_domain::config::CorsConfig;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowHeaders, AllowOrigin, Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the API routes.
///
/// Routes are split into **public** (no identity required) and
/// **protected** (caller identity resolved by [`auth::require_caller`]).
pub fn router() -> Router<AppState> {
    let public = Router::new().route("/v1/readiness", get(readiness::readiness));

    let protected = Router::new()
        .route("/v1/ask", post(ask::ask))
        .route("/v1/quota", get(quota::quota))
        .layer(middleware::from_fn(auth::require_caller));

    public.merge(protected)
}

/// The complete application: routes plus panic recovery, request spans and
/// CORS. CORS is outermost so preflights never reach the routes and every
/// response, including 401s, carries the CORS headers.
pub fn app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);

    router()
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "http",
                    method = %req.method(),
                    path = %req.uri().path(),
                    request_id = %uuid::Uuid::new_v4(),
                )
            }),
        )
        .layer(cors)
        .with_state(state)
}

/// `{"error": message}` with the given status.
pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(detail, "request handler panicked");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
}

/// Build a [`CorsLayer`] from the configured origins and headers.
///
/// A single `"*"` origin allows every origin. Other entries are exact
/// origins, or `scheme://host:*` to match any port on that host.
pub fn build_cors_layer(cors: &CorsConfig) -> CorsLayer {
    let headers: Vec<HeaderName> = cors
        .allowed_headers
        .iter()
        .filter_map(|h| match h.parse::<HeaderName>() {
            Ok(name) => Some(name),
            Err(_) => {
                tracing::warn!(header = %h, "invalid CORS header name, skipping");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers(AllowHeaders::list(headers));

    if cors.is_wildcard() {
        return layer.allow_origin(AnyOrigin);
    }

    // Partition into exact origins and wildcard-port patterns.
    let mut exact: Vec<HeaderValue> = Vec::new();
    let mut wildcard_prefixes: Vec<String> = Vec::new();

    for origin in &cors.allowed_origins {
        if origin.ends_with(":*") {
            wildcard_prefixes.push(origin.trim_end_matches('*').to_owned());
        } else if let Ok(hv) = origin.parse::<HeaderValue>() {
            exact.push(hv);
        } else {
            tracing::warn!(origin = %origin, "invalid CORS origin, skipping");
        }
    }

    let allow_origin = if wildcard_prefixes.is_empty() {
        AllowOrigin::list(exact)
    } else {
        AllowOrigin::predicate(move |origin, _| {
            if exact.iter().any(|e| e.as_bytes() == origin.as_bytes()) {
                return true;
            }
            let origin = origin.to_str().unwrap_or("");
            wildcard_prefixes.iter().any(|prefix| {
                origin
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|port| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
            })
        })
    };

    layer.allow_origin(allow_origin)
}
