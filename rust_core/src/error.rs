//! Error type shared by the external API clients.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure, including request timeouts
    #[error("{api} request failed: {source}")]
    Http {
        api: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{api} returned {status}: {body}")]
    Status {
        api: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    /// Body was not JSON or did not have the expected shape
    #[error("{api} response could not be decoded: {message}")]
    Decode { api: &'static str, message: String },

    #[error("{api} API circuit breaker is open")]
    CircuitOpen { api: &'static str },
}

impl ApiError {
    pub fn api(&self) -> &'static str {
        match self {
            ApiError::Http { api, .. }
            | ApiError::Status { api, .. }
            | ApiError::Decode { api, .. }
            | ApiError::CircuitOpen { api } => api,
        }
    }

    /// Whether the request reached the API and was answered
    pub fn is_status(&self) -> bool {
        matches!(self, ApiError::Status { .. })
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
