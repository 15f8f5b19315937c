use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::configs::{SchemaManager, Settings, Storage};
use crate::docs::openapi;
use crate::handles::*;
use crate::middlewares::TokenState;
use crate::repositories::{
    AccessTokenRepository, NotificationRepository, UserRepository, UserTokenRepository,
};
use crate::services::{AuthService, CacheService, TokenService, WeatherService};

pub async fn create_app(settings: &Arc<Settings>) -> anyhow::Result<Router> {
    let storage =
        Arc::new(Storage::new(settings.database.clone(), SchemaManager::default()).await?);

    Ok(create_router(settings, storage))
}

/// Wires services and handlers over an existing storage.
pub fn create_router(settings: &Settings, storage: Arc<Storage>) -> Router {
    let auth_service = Arc::new(AuthService::new());
    let token_service = Arc::new(TokenService::new(settings.auth.clone()));
    let cache_service = Arc::new(CacheService::new(None));
    let weather_service = Arc::new(WeatherService::new(settings.weather.clone(), cache_service));

    let user_repository = Arc::new(UserRepository::new(storage.clone()));
    let access_token_repository = Arc::new(AccessTokenRepository::new(storage.clone()));
    let user_token_repository = Arc::new(UserTokenRepository::new(storage.clone()));
    let notification_repository = Arc::new(NotificationRepository::new(storage.clone()));

    let token_state = TokenState {
        token_service: token_service.clone(),
        access_token_repository: access_token_repository.clone(),
    };

    let auth = auth_router(
        AuthState {
            auth_service,
            token_service,
            user_repository,
            access_token_repository,
            user_token_repository,
            token_state: token_state.clone(),
            avatar_dir: PathBuf::from(&settings.uploads.avatar_dir),
        },
        token_state.clone(),
    );

    let notifications = notification_router(
        NotificationState {
            notification_repository,
        },
        token_state.clone(),
    );

    let weather = weather_router(WeatherState { weather_service }, token_state);

    Router::new()
        .merge(auth)
        .merge(notifications)
        .merge(weather)
        .route("/api/openapi.json", get(openapi))
        .nest_service("/avatars", ServeDir::new(&settings.uploads.avatar_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
