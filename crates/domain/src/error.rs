/// Shared error type used across all sml crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    /// The upstream completion API answered with a non-success status.
    #[error("provider {provider} returned HTTP {status}: {body}")]
    UpstreamStatus {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("usage store: {0}")]
    Store(String),

    #[error("auth: {0}")]
    Auth(String),
}

impl Error {
    /// A failed HTTP exchange: [`Error::Timeout`] when the client gave up
    /// waiting, [`Error::Http`] otherwise.
    pub fn transport(timed_out: bool, detail: impl std::fmt::Display) -> Self {
        if timed_out {
            Error::Timeout(detail.to_string())
        } else {
            Error::Http(detail.to_string())
        }
    }

    /// HTTP status reported by the upstream, when the failure carries one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Error::UpstreamStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
