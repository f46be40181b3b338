//! Details request and response DTOs.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use super::validation::{max_chars, no_control_chars};
use crate::details::{Details, Summary};
use crate::error::ErrorKind;
use crate::upstream::path::MAX_PATH_LENGTH;

/// Query parameters of `GET /api/details`.
#[derive(Debug, Default, Deserialize)]
pub struct DetailsQuery {
    /// Repository path. The configured default path is used when absent.
    pub path: Option<String>,
}

impl Validate for DetailsQuery {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(path) = &self.path {
            if let Err(e) = max_chars(path, MAX_PATH_LENGTH) {
                errors.add("path", e);
            }
            if let Err(e) = no_control_chars(path) {
                errors.add("path", e);
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Details response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsResponse {
    /// Aggregated summary.
    #[serde(flatten)]
    pub summary: Summary,
    /// Whether some descendants were left out of the summary.
    pub degraded: bool,
    /// Number of descendants left out.
    pub skipped_entries: usize,
    /// `PartialAggregationLoss` when degraded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<ErrorKind>,
}

impl From<Details> for DetailsResponse {
    fn from(details: Details) -> Self {
        let degraded = details.is_degraded();
        Self {
            summary: details.summary,
            degraded,
            skipped_entries: details.skipped,
            warning: degraded.then_some(ErrorKind::PartialAggregationLoss),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::details::merge;
    use crate::upstream::Entry;

    #[test]
    fn test_query_validation() {
        assert!(DetailsQuery::default().validate().is_ok());
        assert!(DetailsQuery {
            path: Some("storage/docs".to_string())
        }
        .validate()
        .is_ok());

        let errors = DetailsQuery {
            path: Some("storage/\u{0}".to_string()),
        }
        .validate()
        .unwrap_err();
        assert!(errors.field_errors().contains_key("path"));

        assert!(DetailsQuery {
            path: Some("a".repeat(MAX_PATH_LENGTH + 1))
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_response_shape() {
        let summary = merge(
            &Entry::directory("storage"),
            &[Summary::for_file(&Entry::file("storage/a", 3), None)],
        );

        let complete = serde_json::to_value(DetailsResponse::from(Details {
            summary: summary.clone(),
            skipped: 0,
        }))
        .unwrap();
        assert_eq!(complete["name"], "storage");
        assert_eq!(complete["kind"], "directory");
        assert_eq!(complete["totalSizeBytes"], 3);
        assert_eq!(complete["fileCount"], 1);
        assert_eq!(complete["degraded"], false);
        assert_eq!(complete["skippedEntries"], 0);
        assert!(complete.get("warning").is_none());

        let partial =
            serde_json::to_value(DetailsResponse::from(Details { summary, skipped: 2 })).unwrap();
        assert_eq!(partial["degraded"], true);
        assert_eq!(partial["skippedEntries"], 2);
        assert_eq!(partial["warning"], "PartialAggregationLoss");
    }
}
