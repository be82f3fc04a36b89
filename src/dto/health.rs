use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Reason the object store reported itself unhealthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_error: Option<String>,
}

impl HealthResponse {
    /// The object store answered its health check.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            storage_error: None,
        }
    }

    /// The object store failed its health check with `reason`.
    pub fn degraded(reason: String) -> Self {
        Self {
            status: "degraded".to_string(),
            storage_error: Some(reason),
        }
    }
}
