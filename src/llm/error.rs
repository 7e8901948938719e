//! Backend errors for LLM-backed analysis services

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors that can occur while talking to an analysis backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendError {
    /// API request failed with the given message
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    /// Authentication failed or credentials are invalid
    AuthenticationError { message: String },

    /// Request timed out after the specified duration (in seconds)
    TimeoutError { seconds: u64 },

    /// Rate limit exceeded, retry after the specified duration (in seconds)
    RateLimitError { retry_after: Option<u64> },

    /// The model answered with something that is not the expected JSON document
    InvalidResponse {
        message: String,
        raw_response: Option<String>,
    },

    /// Missing API keys, unknown provider and the like
    ConfigurationError { message: String },

    NetworkError { message: String },

    Other { message: String },
}

impl BackendError {
    pub fn invalid_response(message: impl Into<String>, raw: impl Into<String>) -> Self {
        BackendError::InvalidResponse {
            message: message.into(),
            raw_response: Some(raw.into()),
        }
    }

    /// Whether a later attempt with the same input could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendError::TimeoutError { .. }
                | BackendError::RateLimitError { .. }
                | BackendError::NetworkError { .. }
        )
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::ApiError {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "API error ({}): {}", code, message)
                } else {
                    write!(f, "API error: {}", message)
                }
            }
            BackendError::AuthenticationError { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            BackendError::TimeoutError { seconds } => {
                write!(f, "Request timed out after {} seconds", seconds)
            }
            BackendError::RateLimitError { retry_after } => {
                if let Some(seconds) = retry_after {
                    write!(f, "Rate limit exceeded, retry after {} seconds", seconds)
                } else {
                    write!(f, "Rate limit exceeded")
                }
            }
            BackendError::InvalidResponse { message, .. } => {
                write!(f, "Invalid response from model: {}", message)
            }
            BackendError::ConfigurationError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            BackendError::NetworkError { message } => {
                write!(f, "Network error: {}", message)
            }
            BackendError::Other { message } => {
                write!(f, "Error: {}", message)
            }
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = BackendError::ApiError {
            message: "quota".to_string(),
            status_code: Some(429),
        };
        assert_eq!(err.to_string(), "API error (429): quota");

        let err = BackendError::invalid_response("expected an object", "[]");
        assert!(err.to_string().starts_with("Invalid response from model"));
    }

    #[test]
    fn test_transient() {
        assert!(BackendError::TimeoutError { seconds: 30 }.is_transient());
        assert!(!BackendError::AuthenticationError {
            message: "bad key".to_string()
        }
        .is_transient());
    }
}
