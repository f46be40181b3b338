//! Details handler for Web API.

use axum::{extract::State, Json};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use crate::details::Aggregator;
use crate::logging::details_span;
use crate::web::dto::{DetailsQuery, DetailsResponse, ValidatedQuery};
use crate::web::error::ApiError;
use crate::RepoDriveError;

/// Shared state of the API handlers.
pub struct AppState {
    /// Details aggregation engine.
    pub aggregator: Aggregator,
    /// Path used when a request names none.
    pub default_path: String,
    /// Time budget of one details request.
    pub request_timeout: Duration,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        aggregator: Aggregator,
        default_path: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            aggregator,
            default_path: default_path.into(),
            request_timeout,
        }
    }
}

/// GET /api/details?path= - Aggregated size, file count and last modification.
pub async fn get_details(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<DetailsQuery>,
) -> Result<Json<DetailsResponse>, ApiError> {
    let path = query.path.unwrap_or_else(|| state.default_path.clone());
    let timeout = state.request_timeout;
    let span = details_span(&path);

    async move {
        let details = match tokio::time::timeout(timeout, state.aggregator.aggregate(&path)).await
        {
            Ok(result) => result,
            Err(_) => Err(RepoDriveError::Timeout(timeout)),
        };

        match details {
            Ok(details) => {
                if details.is_degraded() {
                    tracing::warn!(
                        skipped = details.skipped,
                        "Returning degraded summary"
                    );
                } else {
                    tracing::info!(
                        bytes = details.summary.total_size_bytes,
                        "Details resolved"
                    );
                }
                Ok(Json(DetailsResponse::from(details)))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Details request failed");
                Err(ApiError::from(e))
            }
        }
    }
    .instrument(span)
    .await
}
