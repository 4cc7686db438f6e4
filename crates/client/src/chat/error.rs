//! Chat client error types.

use std::sync::Arc;

/// Errors from the chat assistant client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChatError {
    /// No endpoint configured.
    #[error("missing chat endpoint")]
    MissingEndpoint,

    /// Message was empty after trimming.
    #[error("empty message")]
    EmptyMessage,

    /// The backend answered with an error status or an `error` field.
    #[error("backend error: {0}")]
    Backend(String),

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { ChatError::Timeout } else { ChatError::Network(Arc::new(err)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert!(ChatError::MissingEndpoint.to_string().contains("endpoint"));
        assert!(ChatError::Backend("quota".into()).to_string().contains("quota"));
    }
}
