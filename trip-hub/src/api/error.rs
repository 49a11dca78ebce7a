use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;
use trip_hub_core::StoreError;

/// Store failures rendered as short JSON messages. Storage details are logged
/// and never sent to the client.
#[derive(Debug)]
pub struct ApiError(pub StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            StoreError::Validation(reason) => (
                StatusCode::BAD_REQUEST,
                json!({"error": "invalid", "detail": reason}),
            ),
            StoreError::Authorization(_) => (StatusCode::FORBIDDEN, json!({"error": "not admin"})),
            StoreError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({"error": "not found", "detail": what}),
            ),
            StoreError::Storage(reason) => {
                error!(%reason, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "storage failure"}),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
