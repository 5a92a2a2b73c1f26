use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::RefreshJobState;

/// Broad error category used for retry decisions and user-facing handling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Client-side request timeout.
    Timeout,
    /// Upstream gateway timed out (HTTP 504).
    GatewayTimeout,
    /// Other transport or server failure.
    Network,
    /// Authentication/authorization failure.
    Auth,
    /// Invalid request or unsupported state.
    Config,
    /// Response could not be decoded.
    Serialization,
    /// The operation was cancelled by its owner.
    Cancelled,
    /// Internal bug or invariant break.
    Internal,
}

/// Stable error payload crossing the transport/core boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{category:?}:{code}: {message}")]
pub struct InboxError {
    /// High-level error category.
    pub category: ErrorCategory,
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl InboxError {
    /// Construct a new error.
    pub fn new(
        category: ErrorCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Build an error from an HTTP response status.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(classify_http_status(status), "http_error", message)
    }

    /// Build a client-side request timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Timeout, "request_timeout", message)
    }

    /// Build the error returned when an operation observes its cancellation.
    pub fn cancelled(action: impl Into<String>) -> Self {
        let action = action.into();
        Self::new(
            ErrorCategory::Cancelled,
            "cancelled",
            format!("'{action}' was cancelled"),
        )
    }

    /// Build a standard invalid-state-transition error.
    pub fn invalid_state(current: RefreshJobState, action: impl Into<String>) -> Self {
        let action = action.into();
        Self::new(
            ErrorCategory::Internal,
            "invalid_state_transition",
            format!("cannot run '{action}' while refresh job is in state {current:?}"),
        )
    }

    /// Whether the failure is likely temporary and may be retried within a budget.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.category,
            ErrorCategory::Timeout | ErrorCategory::GatewayTimeout
        )
    }
}

/// Map HTTP status codes to error categories.
pub fn classify_http_status(status: u16) -> ErrorCategory {
    match status {
        401 | 403 => ErrorCategory::Auth,
        408 => ErrorCategory::Timeout,
        504 => ErrorCategory::GatewayTimeout,
        400..=499 => ErrorCategory::Config,
        500..=599 => ErrorCategory::Network,
        _ => ErrorCategory::Internal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_http_status_categories() {
        assert_eq!(classify_http_status(401), ErrorCategory::Auth);
        assert_eq!(classify_http_status(408), ErrorCategory::Timeout);
        assert_eq!(classify_http_status(504), ErrorCategory::GatewayTimeout);
        assert_eq!(classify_http_status(404), ErrorCategory::Config);
        assert_eq!(classify_http_status(502), ErrorCategory::Network);
        assert_eq!(classify_http_status(700), ErrorCategory::Internal);
    }

    #[test]
    fn only_timeouts_are_transient() {
        assert!(InboxError::timeout("slow").is_transient());
        assert!(InboxError::from_http_status(504, "gateway").is_transient());
        assert!(!InboxError::from_http_status(502, "bad gateway").is_transient());
        assert!(!InboxError::from_http_status(401, "denied").is_transient());
        assert!(!InboxError::cancelled("check").is_transient());
    }

    #[test]
    fn keeps_invalid_state_error_code_stable() {
        let err = InboxError::invalid_state(RefreshJobState::Polling, "issue");
        assert_eq!(err.code, "invalid_state_transition");
        assert_eq!(err.category, ErrorCategory::Internal);
        assert!(err.message.contains("Polling"));
    }
}
