//! API error handling.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::{ErrorKind, RepoDriveError};

/// HTTP status reported for an error kind.
pub fn status_code(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
        ErrorKind::UpstreamRateLimited => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::PartialAggregationLoss | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Error kind.
    pub error: ErrorKind,
    /// Human-readable description.
    pub detail: String,
    /// Seconds until the upstream accepts calls again.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    detail: String,
    retry_after_secs: Option<u64>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            retry_after_secs: None,
        }
    }

    /// Create a bad request error.
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, detail)
    }

    /// Create an internal server error.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, detail)
    }

    /// Attach a retry hint.
    pub fn with_retry_after(mut self, retry_after_secs: Option<u64>) -> Self {
        self.retry_after_secs = retry_after_secs;
        self
    }

    /// Error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP status of this error.
    pub fn status_code(&self) -> StatusCode {
        status_code(self.kind)
    }

    /// Create a bad request error from validator::ValidationErrors.
    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, field_errors)| {
                field_errors.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field));
                    format!("{}: {}", field, message)
                })
            })
            .collect();
        messages.sort();

        Self::bad_request(messages.join("; "))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = self.retry_after_secs;
        let body = ErrorBody {
            error: self.kind,
            detail: self.detail,
            retry_after_secs: retry_after,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.detail)
    }
}

impl std::error::Error for ApiError {}

impl From<RepoDriveError> for ApiError {
    fn from(err: RepoDriveError) -> Self {
        match &err {
            RepoDriveError::UpstreamRateLimited { retry_after_secs } => {
                ApiError::new(err.kind(), err.to_string()).with_retry_after(*retry_after_secs)
            }
            RepoDriveError::Io(_) | RepoDriveError::Config(_) | RepoDriveError::Internal(_) => {
                tracing::error!("Internal error: {}", err);
                ApiError::internal("An internal error occurred")
            }
            _ => ApiError::new(err.kind(), err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_status() {
        assert_eq!(status_code(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_code(ErrorKind::UpstreamUnavailable),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_code(ErrorKind::UpstreamRateLimited),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(status_code(ErrorKind::Timeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_code(ErrorKind::BadRequest), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_code(ErrorKind::Internal),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_domain_error() {
        let err = ApiError::from(RepoDriveError::NotFound("storage".to_string()));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.detail, "storage not found");

        let err = ApiError::from(RepoDriveError::UnexpectedResponse("html".to_string()));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);

        let err = ApiError::from(RepoDriveError::UpstreamRateLimited {
            retry_after_secs: Some(30),
        });
        assert_eq!(err.kind(), ErrorKind::UpstreamRateLimited);
        assert_eq!(err.retry_after_secs, Some(30));
    }

    #[test]
    fn test_internal_errors_are_masked() {
        let err = ApiError::from(RepoDriveError::Internal("arena corrupted".to_string()));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.detail, "An internal error occurred");
    }

    #[test]
    fn test_into_response_sets_retry_after() {
        let response = ApiError::from(RepoDriveError::UpstreamRateLimited {
            retry_after_secs: Some(42),
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "42");
    }

    #[test]
    fn test_into_response_without_retry_hint() {
        let response = ApiError::from(RepoDriveError::UpstreamRateLimited {
            retry_after_secs: None,
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
    }

    #[test]
    fn test_error_body_serialization() {
        let body = ErrorBody {
            error: ErrorKind::UpstreamRateLimited,
            detail: "upstream rate limit exceeded".to_string(),
            retry_after_secs: Some(5),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "UpstreamRateLimited");
        assert_eq!(json["detail"], "upstream rate limit exceeded");
        assert_eq!(json["retryAfterSecs"], 5);

        let body = ErrorBody {
            error: ErrorKind::NotFound,
            detail: "x not found".to_string(),
            retry_after_secs: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("retryAfterSecs").is_none());
    }
}
