pub mod api;
pub mod auth;
pub mod notification;
pub mod validation;
pub mod weather;

pub use api::ApiError;
pub use auth::AuthError;
pub use notification::NotificationError;
pub use validation::ValidationError;
pub use weather::WeatherError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use uuid::Uuid;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::AuthError(e) => (e.status_code(), json!({ "message": e.to_string() })),
            ApiError::NotificationError(e) => {
                (e.status_code(), json!({ "message": e.to_string() }))
            }
            ApiError::WeatherError(e) => {
                let WeatherError::Provider(source) = &e;
                tracing::warn!("weather provider failed: {:#}", source);
                (e.status_code(), json!({ "message": e.to_string() }))
            }
            ApiError::ValidationError(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "message": e.message(), "errors": e.errors() }),
            ),
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "message": message }))
            }
            ApiError::DatabaseError(e) => {
                let error_id = Uuid::new_v4();
                tracing::error!(error_id = ?error_id, "Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal server error", "error_id": error_id.to_string() }),
                )
            }
            ApiError::InternalError(e) => {
                let error_id = Uuid::new_v4();
                tracing::error!(error_id = ?error_id, "Internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal server error", "error_id": error_id.to_string() }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
