//! Shared utility functions for provider adapters.

use sml_domain::error::{Error, Result};

/// Read an API key from the named environment variable.
///
/// Unset, non-UTF-8 and blank values are all reported as [`Error::Auth`].
pub fn resolve_api_key(env_var: &str) -> Result<String> {
    match std::env::var(env_var) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_owned()),
        Ok(_) => Err(Error::Auth(format!(
            "environment variable '{env_var}' is empty"
        ))),
        Err(_) => Err(Error::Auth(format!(
            "environment variable '{env_var}' not set or not valid UTF-8"
        ))),
    }
}
