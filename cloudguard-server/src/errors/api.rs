use super::{AuthError, NotificationError, ValidationError, WeatherError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Notification error: {0}")]
    NotificationError(#[from] NotificationError),

    #[error("Weather error: {0}")]
    WeatherError(#[from] WeatherError),

    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Malformed request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}
