//! Client Error Types
//!
//! One taxonomy for everything that can go wrong between the UI and the
//! chat service, with the retryability classification attached: only
//! transient transport failures are worth a second attempt; an upstream
//! `error` event or a non-2xx status is authoritative and surfaces
//! immediately.

use thiserror::Error;

/// Errors surfaced by the chat and workflow API calls.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChatClientError {
    /// The client-side timeout elapsed before the service responded.
    #[error("Network timeout. Please try again.")]
    Timeout,

    /// Transport-level failure (connection refused, reset, DNS, ...).
    #[error("Network error: {message}")]
    Network { message: String },

    /// The service answered with a non-2xx status. The message carries
    /// the server-provided error text when there was any.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// The stream delivered an `error` event; the query failed upstream.
    #[error("{message}")]
    Upstream { message: String },

    /// A response body that should have been JSON was not.
    #[error("Failed to parse server response: {message}")]
    Parse { message: String },

    /// No bearer token is configured; the call never left the client.
    #[error("Authentication token is missing. Please sign in again.")]
    MissingToken,

    /// No session id is available; the call never left the client.
    #[error("No active session.")]
    MissingSession,
}

impl ChatClientError {
    /// Whether a retry has any chance of helping.
    ///
    /// Timeouts and transport failures are transient. Anything else only
    /// retries when its message reads like a transport failure, which
    /// covers errors re-wrapped by intermediate layers.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChatClientError::Timeout | ChatClientError::Network { .. } => true,
            other => {
                let message = other.to_string().to_lowercase();
                message.contains("timeout")
                    || message.contains("network")
                    || message.contains("failed to fetch")
            }
        }
    }
}

/// Result type alias for client operations.
pub type ChatResult<T> = Result<T, ChatClientError>;

pub(crate) fn network_error(err: reqwest::Error) -> ChatClientError {
    if err.is_timeout() {
        ChatClientError::Timeout
    } else {
        ChatClientError::Network {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors_are_retryable() {
        assert!(ChatClientError::Timeout.is_retryable());
        assert!(ChatClientError::Network {
            message: "connection reset".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_authoritative_errors_are_not_retryable() {
        assert!(!ChatClientError::Http {
            status: 500,
            message: "HTTP error 500".to_string()
        }
        .is_retryable());
        assert!(!ChatClientError::Upstream {
            message: "orchestrator failed".to_string()
        }
        .is_retryable());
        assert!(!ChatClientError::MissingSession.is_retryable());
    }

    #[test]
    fn test_message_content_reclassifies() {
        assert!(ChatClientError::Upstream {
            message: "gateway timeout".to_string()
        }
        .is_retryable());
        assert!(ChatClientError::Parse {
            message: "Failed to fetch".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_timeout_message_is_user_facing() {
        assert_eq!(
            ChatClientError::Timeout.to_string(),
            "Network timeout. Please try again."
        );
    }
}
