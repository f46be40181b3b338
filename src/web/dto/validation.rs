//! Validation utilities for Web API DTOs.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::web::error::ApiError;

/// A query string extractor that validates the parsed parameters.
///
/// This extractor deserializes the query string and then validates it using
/// the `validator` crate. Malformed or invalid parameters are rejected with a
/// `BadRequest` error before any upstream call is made.
///
/// # Example
///
/// ```ignore
/// use repodrive::web::dto::{DetailsQuery, ValidatedQuery};
///
/// async fn get_details(
///     ValidatedQuery(query): ValidatedQuery<DetailsQuery>,
/// ) -> Result<Json<DetailsResponse>, ApiError> {
///     // query is already validated
///     // ...
/// }
/// ```
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid query: {}", e)))?;

        value.validate().map_err(ApiError::from_validation_errors)?;

        Ok(ValidatedQuery(value))
    }
}

// ============================================================================
// Custom Validators
// ============================================================================

/// Validate that a string does not contain control characters or NULL bytes.
pub fn no_control_chars(value: &str) -> Result<(), validator::ValidationError> {
    if value.chars().any(char::is_control) {
        return Err(validator::ValidationError::new("no_control_chars")
            .with_message("Must not contain control characters".into()));
    }
    Ok(())
}

/// Validate that a string is at most `max` characters long.
pub fn max_chars(value: &str, max: usize) -> Result<(), validator::ValidationError> {
    if value.chars().count() > max {
        return Err(validator::ValidationError::new("length")
            .with_message(format!("Must be at most {} characters", max).into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_control_chars_valid() {
        assert!(no_control_chars("storage/docs/a.txt").is_ok());
        assert!(no_control_chars("").is_ok());
        assert!(no_control_chars("日本語/ファイル").is_ok());
    }

    #[test]
    fn test_no_control_chars_invalid() {
        assert!(no_control_chars("Hello\x00World").is_err()); // NULL byte
        assert!(no_control_chars("Hello\x07World").is_err()); // Bell
        assert!(no_control_chars("Line 1\nLine 2").is_err());
        assert!(no_control_chars("Tab\there").is_err());
    }

    #[test]
    fn test_max_chars() {
        assert!(max_chars("abc", 3).is_ok());
        assert!(max_chars("abcd", 3).is_err());
        assert!(max_chars("ファイル", 4).is_ok());
    }
}
