//! Caller identity middleware.
//!
//! The caller is identified by the `sub` claim of the session token in the
//! `Authorization: Bearer <token>` header. The token's signature is NOT
//! verified here: this service must sit behind a gateway that has already
//! authenticated the token, and treats the claim as trusted input. Exposing
//! it directly to untrusted clients would let anyone pick their identity.
//!
//! Protected requests without a usable identity get 401 before any handler,
//! store or upstream work runs.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;

use crate::api::api_error;

/// Standard alphabet, padding optional.
const CLAIMS_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Identity of the current caller, inserted as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

impl CallerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Extract the `sub` claim from an `Authorization` header value.
///
/// Returns `None` for anything that is not a three-part token whose middle
/// segment decodes to a JSON object with a non-empty string `sub`.
pub fn caller_id_from_authorization(value: &str) -> Option<String> {
    let token = value.strip_prefix("Bearer ").unwrap_or(value);
    let payload = token.split('.').nth(1)?;
    if payload.is_empty() {
        return None;
    }

    let translated: String = payload
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let bytes = CLAIMS_ENGINE.decode(translated).ok()?;

    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims
        .as_object()?
        .get("sub")?
        .as_str()
        .filter(|sub| !sub.is_empty())
        .map(str::to_owned)
}

/// Axum middleware that resolves the caller or answers 401.
/// Attach via `axum::middleware::from_fn`.
pub async fn require_caller(mut req: Request<Body>, next: Next) -> Response {
    let Some(value) = req.headers().get(header::AUTHORIZATION) else {
        return api_error(StatusCode::UNAUTHORIZED, "please sign in first");
    };

    let caller = value.to_str().ok().and_then(caller_id_from_authorization);
    let Some(caller) = caller else {
        tracing::debug!("rejected request with unusable authorization header");
        return api_error(StatusCode::UNAUTHORIZED, "invalid authentication credentials");
    };

    req.extensions_mut().insert(CallerId(caller));
    next.run(req).await
}
