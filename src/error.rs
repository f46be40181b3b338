//! Error types for repodrive.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Common error type for repodrive.
#[derive(Error, Debug)]
pub enum RepoDriveError {
    /// The requested path does not exist upstream.
    #[error("{0} not found")]
    NotFound(String),

    /// The upstream content store could not be reached or answered with a
    /// non-success status.
    #[error("upstream unavailable ({}): {reason}", status_label(.status))]
    UpstreamUnavailable {
        /// HTTP status returned by the upstream, if a response was received.
        status: Option<u16>,
        /// Upstream reason or transport error message.
        reason: String,
    },

    /// The upstream rejected the call because its rate limit is exhausted.
    #[error("upstream rate limit exceeded")]
    UpstreamRateLimited {
        /// Seconds until the upstream accepts calls again, when advertised.
        retry_after_secs: Option<u64>,
    },

    /// The upstream answered with a body that does not match its contract.
    #[error("unexpected upstream response: {0}")]
    UnexpectedResponse(String),

    /// The request did not complete within its time budget.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for user input or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal invariant violated.
    #[error("internal error: {0}")]
    Internal(String),
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {code}"),
        None => "no response".to_string(),
    }
}

impl RepoDriveError {
    /// Whether the caller may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RepoDriveError::UpstreamUnavailable { .. }
                | RepoDriveError::UpstreamRateLimited { .. }
                | RepoDriveError::Timeout(_)
        )
    }

    /// Public error kind reported to API clients.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepoDriveError::NotFound(_) => ErrorKind::NotFound,
            RepoDriveError::UpstreamUnavailable { .. } | RepoDriveError::UnexpectedResponse(_) => {
                ErrorKind::UpstreamUnavailable
            }
            RepoDriveError::UpstreamRateLimited { .. } => ErrorKind::UpstreamRateLimited,
            RepoDriveError::Timeout(_) => ErrorKind::Timeout,
            RepoDriveError::Validation(_) => ErrorKind::BadRequest,
            RepoDriveError::Io(_) | RepoDriveError::Config(_) | RepoDriveError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Error kinds as exposed in API error payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// The root path is absent upstream.
    NotFound,
    /// Network failure or 5xx from the upstream.
    UpstreamUnavailable,
    /// The upstream rate limit is exhausted.
    UpstreamRateLimited,
    /// Some descendants could not be resolved and were left out of a
    /// summary. Reported alongside a successful response, never as a failure.
    PartialAggregationLoss,
    /// The request exceeded its time budget.
    Timeout,
    /// The request itself is malformed.
    BadRequest,
    /// Anything else.
    Internal,
}

/// Result type alias for repodrive operations.
pub type Result<T> = std::result::Result<T, RepoDriveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error_display() {
        let err = RepoDriveError::NotFound("storage/a.txt".to_string());
        assert_eq!(err.to_string(), "storage/a.txt not found");
    }

    #[test]
    fn test_upstream_unavailable_display() {
        let err = RepoDriveError::UpstreamUnavailable {
            status: Some(502),
            reason: "Bad Gateway".to_string(),
        };
        assert_eq!(err.to_string(), "upstream unavailable (HTTP 502): Bad Gateway");

        let err = RepoDriveError::UpstreamUnavailable {
            status: None,
            reason: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "upstream unavailable (no response): connection refused"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RepoDriveError = io_err.into();
        assert!(matches!(err, RepoDriveError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_timeout_display_keeps_subsecond_budgets() {
        let err = RepoDriveError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "request timed out after 250ms");

        let err = RepoDriveError::Timeout(Duration::from_secs(60));
        assert_eq!(err.to_string(), "request timed out after 60s");
    }

    #[test]
    fn test_retryable() {
        assert!(RepoDriveError::Timeout(Duration::from_secs(5)).is_retryable());
        assert!(RepoDriveError::UpstreamRateLimited {
            retry_after_secs: None
        }
        .is_retryable());
        assert!(!RepoDriveError::NotFound("x".to_string()).is_retryable());
        assert!(!RepoDriveError::Validation("bad".to_string()).is_retryable());
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            RepoDriveError::NotFound("x".to_string()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            RepoDriveError::UnexpectedResponse("html".to_string()).kind(),
            ErrorKind::UpstreamUnavailable
        );
        assert_eq!(
            RepoDriveError::Validation("..".to_string()).kind(),
            ErrorKind::BadRequest
        );
        assert_eq!(
            RepoDriveError::Config("oops".to_string()).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_error_kind_serialize() {
        let json = serde_json::to_string(&ErrorKind::UpstreamRateLimited).unwrap();
        assert_eq!(json, "\"UpstreamRateLimited\"");
    }
}
