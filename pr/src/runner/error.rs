//! Runner error types and failure classification

use std::time::Duration;
use thiserror::Error;

/// HTTP-style status codes that indicate a transient, rate-related failure
pub const RETRYABLE_STATUS: [u16; 4] = [408, 429, 503, 529];

/// How the scheduler reacts to a failed send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Back off and place the item later on the timeline
    Retryable,
    /// Stop the whole run
    Fatal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Retryable => write!(f, "retryable"),
            FailureKind::Fatal => write!(f, "fatal"),
        }
    }
}

/// Errors that can occur during a runner call
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Input exceeds token limit: {0}")]
    TokenLimit(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl RunnerError {
    /// Machine-readable status code, when the failure carries one
    pub fn code(&self) -> Option<u16> {
        match self {
            RunnerError::Api { status, .. } => Some(*status),
            RunnerError::Network(e) => e.status().map(|s| s.as_u16()),
            RunnerError::Timeout(_) => Some(408),
            _ => None,
        }
    }

    /// Classify this failure for the retry scheduler
    pub fn kind(&self) -> FailureKind {
        match self {
            RunnerError::TokenLimit(_) => FailureKind::Retryable,
            _ => match self.code() {
                Some(code) if RETRYABLE_STATUS.contains(&code) => FailureKind::Retryable,
                _ => FailureKind::Fatal,
            },
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == FailureKind::Retryable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> RunnerError {
        RunnerError::Api {
            status,
            message: "test".to_string(),
        }
    }

    #[test]
    fn test_retryable_status_codes() {
        for status in RETRYABLE_STATUS {
            assert!(api(status).is_retryable(), "status {} should be retryable", status);
        }
    }

    #[test]
    fn test_other_status_codes_are_fatal() {
        for status in [400, 401, 403, 404, 500, 502] {
            assert_eq!(api(status).kind(), FailureKind::Fatal, "status {}", status);
        }
    }

    #[test]
    fn test_token_limit_is_retryable() {
        let err = RunnerError::TokenLimit("prompt is too long".to_string());
        assert!(err.is_retryable());
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_timeout_maps_to_408() {
        let err = RunnerError::Timeout(Duration::from_secs(30));
        assert_eq!(err.code(), Some(408));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_non_network_failures_are_fatal() {
        assert_eq!(RunnerError::InvalidResponse("bad".to_string()).kind(), FailureKind::Fatal);
        assert_eq!(RunnerError::Config("no key".to_string()).kind(), FailureKind::Fatal);
        assert_eq!(RunnerError::Cancelled.kind(), FailureKind::Fatal);
    }

    #[test]
    fn test_display() {
        assert_eq!(api(429).to_string(), "API error 429: test");
        assert_eq!(FailureKind::Retryable.to_string(), "retryable");
    }
}
