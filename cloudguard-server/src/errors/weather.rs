use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Failed to fetch weather data")]
    Provider(#[source] anyhow::Error),
}

impl WeatherError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WeatherError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
