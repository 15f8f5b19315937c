use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router, middleware};
use cloudguard_api::models::{ErrorResponse, MessageResponse, NotificationResponse};

use crate::errors::{ApiError, NotificationError};
use crate::middlewares::{TokenState, auth};
use crate::repositories::NotificationRepository;
use crate::services::TokenClaims;

#[derive(Clone)]
pub struct NotificationState {
    pub notification_repository: Arc<NotificationRepository>,
}

pub fn notification_router(
    notification_state: NotificationState,
    token_state: TokenState,
) -> Router {
    Router::new()
        .route(
            "/api/notifications",
            get(get_notifications).delete(clear_notifications),
        )
        .route("/api/notifications/read-all", post(mark_all_notifications_read))
        .route("/api/notifications/:id/read", post(mark_notification_read))
        .route("/api/notifications/:id", delete(delete_notification))
        .route_layer(middleware::from_fn_with_state(token_state, auth))
        .with_state(notification_state)
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "notification",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Notifications of the current user, newest first", body = [NotificationResponse]),
        (status = 401, description = "Unauthenticated", body = ErrorResponse)
    )
)]
pub async fn get_notifications(
    Extension(claims): Extension<TokenClaims>,
    State(state): State<NotificationState>,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let notifications = state
        .notification_repository
        .find_by_user(claims.sub)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(notifications))
}

#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    tag = "notification",
    params(
        ("id" = i32, Path, description = "Notification id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Notification marked as read", body = MessageResponse),
        (status = 404, description = "Not found or owned by someone else", body = ErrorResponse)
    )
)]
pub async fn mark_notification_read(
    Extension(claims): Extension<TokenClaims>,
    State(state): State<NotificationState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.notification_repository.mark_read(id, claims.sub).await? {
        return Err(NotificationError::NotFound.into());
    }

    Ok(Json(MessageResponse::new("Notification marked as read")))
}

#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    tag = "notification",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Every notification marked as read", body = MessageResponse)
    )
)]
pub async fn mark_all_notifications_read(
    Extension(claims): Extension<TokenClaims>,
    State(state): State<NotificationState>,
) -> Result<Json<MessageResponse>, ApiError> {
    let updated = state.notification_repository.mark_all_read(claims.sub).await?;
    tracing::debug!(user_id = claims.sub, updated, "notifications marked as read");

    Ok(Json(MessageResponse::new("All notifications marked as read")))
}

#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    tag = "notification",
    params(
        ("id" = i32, Path, description = "Notification id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 404, description = "Not found or owned by someone else", body = ErrorResponse)
    )
)]
pub async fn delete_notification(
    Extension(claims): Extension<TokenClaims>,
    State(state): State<NotificationState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    if !state.notification_repository.delete(id, claims.sub).await? {
        return Err(NotificationError::NotFound.into());
    }

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/notifications",
    tag = "notification",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Every notification deleted", body = MessageResponse)
    )
)]
pub async fn clear_notifications(
    Extension(claims): Extension<TokenClaims>,
    State(state): State<NotificationState>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = state.notification_repository.delete_by_user(claims.sub).await?;
    tracing::debug!(user_id = claims.sub, removed, "notifications cleared");

    Ok(Json(MessageResponse::new("All notifications cleared")))
}
