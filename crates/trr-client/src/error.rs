//! Error types for the TestRail client.

use std::time::Duration;

/// Remote API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Server answered 429; carries the wait it asked for, if any.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Any other non-2xx answer.
    #[error("TestRail API returned HTTP {status} ({message})")]
    Service { status: u16, message: String },

    /// Transport failure (connect, TLS, body read).
    #[error("network error: {message}")]
    Network { message: String },

    /// Body could not be decoded into the expected shape.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// Client configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ApiError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 1,
            Self::Service { .. } | Self::InvalidResponse { .. } => 4,
            Self::RateLimited { .. } | Self::Network { .. } => 5,
        }
    }

    /// Whether the transport retries this error on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::Service { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for client operations.
pub type ApiResult<T> = Result<T, ApiError>;
