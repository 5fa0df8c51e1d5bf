use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::warn;

use insights_common::InsightsError;

/// Handler error: caller mistakes become 400s, everything else a bare 500.
#[derive(Debug)]
pub struct ApiError(pub InsightsError);

impl From<InsightsError> for ApiError {
    fn from(err: InsightsError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        if !err.is_client_error() {
            warn!(error = %err, "Request failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal server error" })),
            )
                .into_response();
        }

        let mut body = json!({ "error": err.to_string() });
        if let Some(name) = err.parameter() {
            body["parameter"] = json!(name);
        }
        if let InsightsError::InvalidParameter { allowed, .. } = &err {
            body["allowed"] = json!(allowed);
        }
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}
