use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification not found")]
    NotFound,
}

impl NotificationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            NotificationError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}
