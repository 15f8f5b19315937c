use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router, middleware};
use cloudguard_api::models::{ErrorResponse, WeatherQuery, WeatherResponse};

use crate::errors::{ApiError, ValidationError};
use crate::middlewares::{TokenState, auth};
use crate::services::WeatherService;

#[derive(Clone)]
pub struct WeatherState {
    pub weather_service: Arc<WeatherService>,
}

pub fn weather_router(weather_state: WeatherState, token_state: TokenState) -> Router {
    Router::new()
        .route("/api/weather", get(get_weather))
        .route_layer(middleware::from_fn_with_state(token_state, auth))
        .with_state(weather_state)
}

fn parse_coordinate(errors: &mut ValidationError, field: &str, value: Option<&str>) -> Option<f64> {
    let value = value.map(str::trim).filter(|value| !value.is_empty());

    let Some(value) = value else {
        errors.add(field, &format!("The {field} field is required."));
        return None;
    };

    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Some(parsed),
        _ => {
            errors.add(field, &format!("The {field} field must be a number."));
            None
        }
    }
}

fn parse_coordinates(query: &WeatherQuery) -> Result<(f64, f64), ValidationError> {
    let mut errors = ValidationError::new();

    let latitude = parse_coordinate(&mut errors, "latitude", query.latitude.as_deref());
    let longitude = parse_coordinate(&mut errors, "longitude", query.longitude.as_deref());

    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Ok((latitude, longitude)),
        _ => Err(errors),
    }
}

#[utoipa::path(
    get,
    path = "/api/weather",
    tag = "weather",
    params(
        ("latitude" = f64, Query, description = "Latitude in decimal degrees"),
        ("longitude" = f64, Query, description = "Longitude in decimal degrees")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Current conditions with hourly and daily forecasts", body = WeatherResponse),
        (status = 422, description = "Missing or non-numeric coordinates", body = ErrorResponse),
        (status = 500, description = "Weather provider failed", body = ErrorResponse)
    )
)]
pub async fn get_weather(
    State(state): State<WeatherState>,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<WeatherResponse>, ApiError> {
    let (latitude, longitude) = parse_coordinates(&query)?;

    let report = state.weather_service.report(latitude, longitude).await?;

    Ok(Json(report))
}
