use thiserror::Error;

/// Errors from a generation-model backend.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Rate limit exceeded: retry after {retry_after:?}s")]
    RateLimitExceeded { retry_after: Option<u64> },

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl LlmError {
    /// Whether a retry under the run's retry budget can succeed.
    /// Transient transport and throttling failures are retryable;
    /// client-side errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimitExceeded { .. } | LlmError::NetworkError(_) | LlmError::Timeout => {
                true
            }
            LlmError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
