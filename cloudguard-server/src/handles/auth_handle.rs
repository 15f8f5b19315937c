use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router, async_trait, middleware};
use cloudguard_api::models::*;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::errors::{ApiError, AuthError, ValidationError};
use crate::middlewares::{TokenState, auth};
use crate::models::{AccessToken, User, UserToken, UserTokenKind};
use crate::repositories::{AccessTokenRepository, UserRepository, UserTokenRepository};
use crate::services::{AuthService, TokenClaims, TokenService};

const MIN_PASSWORD_LENGTH: usize = 8;
const PASSWORD_RESET_TTL: Duration = Duration::hours(1);
const EMAIL_VERIFICATION_TTL: Duration = Duration::days(1);

#[derive(Clone)]
pub struct AuthState {
    pub auth_service: Arc<AuthService>,
    pub token_service: Arc<TokenService>,
    pub user_repository: Arc<UserRepository>,
    pub access_token_repository: Arc<AccessTokenRepository>,
    pub user_token_repository: Arc<UserTokenRepository>,
    pub token_state: TokenState,
    pub avatar_dir: PathBuf,
}

pub fn auth_router(auth_state: AuthState, token_state: TokenState) -> Router {
    Router::new()
        .route("/api/ping", get(ping))
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/auth/refresh", post(refresh_token))
        .route("/api/check-auth", get(check_auth))
        .route("/api/forgot-password", post(forgot_password))
        .route("/api/reset-password", post(reset_password))
        .route("/api/email/verify", post(verify_email))
        .route(
            "/api/email/resend",
            post(resend_verification)
                .route_layer(middleware::from_fn_with_state(token_state.clone(), auth)),
        )
        .route(
            "/api/logout",
            post(logout).route_layer(middleware::from_fn_with_state(token_state.clone(), auth)),
        )
        .route(
            "/api/profile",
            put(update_profile)
                .route_layer(middleware::from_fn_with_state(token_state.clone(), auth)),
        )
        .route(
            "/api/change-password",
            put(change_password)
                .route_layer(middleware::from_fn_with_state(token_state.clone(), auth)),
        )
        .with_state(auth_state)
}

/// Registration body, sent either as JSON or as `multipart/form-data` with an
/// optional `avatar` file part.
pub struct RegisterPayload {
    pub request: RegisterRequest,
    pub avatar: Option<Bytes>,
}

#[async_trait]
impl<S> FromRequest<S> for RegisterPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if !is_multipart {
            let Json(request) = Json::<RegisterRequest>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;

            return Ok(Self {
                request,
                avatar: None,
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        let mut request = RegisterRequest::default();
        let mut avatar = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == "avatar" {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                avatar = Some(bytes).filter(|bytes| !bytes.is_empty());
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;

            match name.as_str() {
                "name" => request.name = value,
                "email" => request.email = value,
                "password" => request.password = value,
                "password_confirmation" => request.password_confirmation = value,
                "device_name" => request.device_name = Some(value),
                _ => tracing::debug!(field = %name, "ignoring unknown registration field"),
            }
        }

        Ok(Self { request, avatar })
    }
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn check_required(errors: &mut ValidationError, field: &str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.add(field, &format!("The {} field is required.", field.replace('_', " ")));
        return false;
    }
    true
}

fn check_email(errors: &mut ValidationError, email: &str) -> bool {
    if !check_required(errors, "email", email) {
        return false;
    }
    if !is_valid_email(email) {
        errors.add("email", "The email field must be a valid email address.");
        return false;
    }
    true
}

fn check_new_password(errors: &mut ValidationError, password: &str, confirmation: &str) {
    if !check_required(errors, "password", password) {
        return;
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add(
            "password",
            &format!("The password field must be at least {MIN_PASSWORD_LENGTH} characters."),
        );
    }
    if password != confirmation {
        errors.add("password", "The password field confirmation does not match.");
    }
}

async fn store_avatar(dir: &Path, bytes: &[u8]) -> Result<String, ApiError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| anyhow!("Failed to create avatar directory: {}", e))?;

    let file_name = format!("{}.jpg", Uuid::new_v4().simple());
    tokio::fs::write(dir.join(&file_name), bytes)
        .await
        .map_err(|e| anyhow!("Failed to store avatar: {}", e))?;

    Ok(format!("/avatars/{file_name}"))
}

/// Creates the session row behind a fresh access token and refresh token.
async fn issue_session(
    state: &AuthState,
    user: User,
    device_name: Option<String>,
) -> Result<AuthResponse, ApiError> {
    let token = state
        .token_service
        .generate_token(&user)
        .map_err(|e| anyhow!("Failed to generate token: {}", e))?;
    let refresh_token = state.token_service.generate_refresh_token();

    let session = AccessToken {
        id: 0,
        user_id: user.id,
        jti: token.jti.clone(),
        device_name: device_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| String::from("unknown")),
        refresh_token: refresh_token.clone(),
        expires_at: state.token_service.refresh_expires_at(),
        created_at: OffsetDateTime::now_utc(),
    };

    let mut tx = state.user_repository.get_pool().begin().await?;
    state.access_token_repository.create(&session, &mut tx).await?;
    tx.commit().await?;

    tracing::info!(user_id = user.id, device = %session.device_name, "access token issued");

    Ok(AuthResponse {
        user: user.into(),
        access_token: Some(token.token),
        token: None,
        token_type: Some(DEFAULT_TOKEN_TYPE.to_string()),
        refresh_token: Some(refresh_token),
    })
}

/// Stores a single-use token; delivery happens out of band.
async fn issue_user_token(
    state: &AuthState,
    user_id: i32,
    kind: UserTokenKind,
    ttl: Duration,
) -> Result<String, ApiError> {
    let now = OffsetDateTime::now_utc();
    let token = Uuid::new_v4().simple().to_string();

    let mut tx = state.user_repository.get_pool().begin().await?;
    state
        .user_token_repository
        .delete_by_user(user_id, kind, &mut tx)
        .await?;
    state
        .user_token_repository
        .create(
            &UserToken {
                id: 0,
                user_id,
                kind: kind.to_string(),
                token: token.clone(),
                expires_at: now + ttl,
                created_at: now,
            },
            &mut tx,
        )
        .await?;
    tx.commit().await?;

    tracing::debug!(user_id, %kind, token = %token, "user token issued");

    Ok(token)
}

/// Looks up a live single-use token.
async fn find_user_token(
    state: &AuthState,
    kind: UserTokenKind,
    token: &str,
) -> Result<Option<UserToken>, ApiError> {
    let found = state.user_token_repository.find(kind, token).await?;

    Ok(found.filter(|row| row.expires_at > OffsetDateTime::now_utc()))
}

#[utoipa::path(
    get,
    path = "/api/ping",
    tag = "auth",
    responses(
        (status = 200, description = "Backend is reachable", body = MessageResponse)
    )
)]
pub async fn ping() -> Json<MessageResponse> {
    Json(MessageResponse::new("pong"))
}

#[utoipa::path(
    post,
    path = "/api/register",
    tag = "auth",
    request_body(content = RegisterRequest, description = "JSON, or multipart/form-data with an optional avatar file"),
    responses(
        (status = 201, description = "Registration successful", body = AuthResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AuthState>,
    payload: RegisterPayload,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let RegisterPayload { request, avatar } = payload;

    let mut errors = ValidationError::new();
    check_required(&mut errors, "name", &request.name);
    if check_email(&mut errors, &request.email)
        && state
            .user_repository
            .find_by_email(&request.email)
            .await?
            .is_some()
    {
        errors.add("email", "The email has already been taken.");
    }
    check_new_password(&mut errors, &request.password, &request.password_confirmation);
    errors.into_result()?;

    let hash_password = state
        .auth_service
        .hash(&request.password)
        .map_err(|e| anyhow!("Failed to hash password: {}", e))?;

    let avatar = match avatar {
        Some(bytes) => Some(store_avatar(&state.avatar_dir, &bytes).await?),
        None => None,
    };

    let now = OffsetDateTime::now_utc();
    let user = User {
        id: 0,
        name: request.name.trim().to_string(),
        email: request.email.trim().to_string(),
        password: hash_password,
        phone: None,
        avatar,
        email_verified_at: None,
        created_at: now,
        updated_at: now,
    };

    let mut tx = state.user_repository.get_pool().begin().await?;
    let id = state.user_repository.create(&user, &mut tx).await?;
    tx.commit().await?;

    let created_user = state
        .user_repository
        .find_by_id(id)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    issue_user_token(
        &state,
        created_user.id,
        UserTokenKind::EmailVerification,
        EMAIL_VERIFICATION_TTL,
    )
    .await?;

    tracing::info!(user_id = created_user.id, "user registered");

    let response = issue_session(&state, created_user, request.device_name).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AuthState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let mut errors = ValidationError::new();
    check_required(&mut errors, "email", &body.email);
    check_required(&mut errors, "password", &body.password);
    errors.into_result()?;

    let user = state
        .user_repository
        .find_by_email(body.email.trim())
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let verified = state
        .auth_service
        .verify(&user, &body.password)
        .map_err(|e| anyhow!("Failed to verify password: {}", e))?;

    if !verified {
        tracing::debug!(user_id = user.id, "password mismatch");
        return Err(AuthError::InvalidCredentials.into());
    }

    Ok(Json(issue_session(&state, user, body.device_name).await?))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token for the same session", body = RefreshResponse),
        (status = 401, description = "Unknown or expired refresh token", body = ErrorResponse)
    )
)]
pub async fn refresh_token(
    State(state): State<AuthState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let session = state
        .access_token_repository
        .find_by_refresh_token(&body.refresh_token)
        .await?
        .ok_or(AuthError::InvalidRefreshToken)?;

    if session.expires_at <= OffsetDateTime::now_utc() {
        state.access_token_repository.delete_by_jti(&session.jti).await?;
        return Err(AuthError::InvalidRefreshToken.into());
    }

    let user = state
        .user_repository
        .find_by_id(session.user_id)
        .await?
        .ok_or(AuthError::InvalidRefreshToken)?;

    let token = state
        .token_service
        .generate_token(&user)
        .map_err(|e| anyhow!("Failed to generate token: {}", e))?;

    state
        .access_token_repository
        .rotate_jti(session.id, &token.jti)
        .await?;

    tracing::info!(user_id = user.id, "access token refreshed");

    Ok(Json(RefreshResponse {
        token: token.token,
        token_type: Some(DEFAULT_TOKEN_TYPE.to_string()),
    }))
}

#[utoipa::path(
    post,
    path = "/api/logout",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Session revoked", body = MessageResponse),
        (status = 401, description = "Unauthenticated", body = ErrorResponse)
    )
)]
pub async fn logout(
    Extension(claims): Extension<TokenClaims>,
    State(state): State<AuthState>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.access_token_repository.delete_by_jti(&claims.jti).await?;

    tracing::info!(user_id = claims.sub, "session revoked");

    Ok(Json(MessageResponse::new("Logged out successfully")))
}

#[utoipa::path(
    get,
    path = "/api/check-auth",
    tag = "auth",
    security(
        (),
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Whether the bearer token is still valid", body = CheckAuthResponse),
        (status = 401, description = "Bearer token is malformed or expired", body = ErrorResponse)
    )
)]
/// Reports whether the caller is signed in.
///
/// A missing header or a revoked session answers `authenticated: false`. A
/// bearer that fails to decode or has expired answers 401, so the client can
/// still exchange its refresh token.
pub async fn check_auth(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<Json<CheckAuthResponse>, ApiError> {
    let Some(header) = TokenState::bearer(&headers) else {
        return Ok(Json(CheckAuthResponse {
            authenticated: false,
            user: None,
        }));
    };

    let claims = state.token_state.verify(header.token())?;

    let user = if state.token_state.is_live(&claims).await? {
        state.user_repository.find_by_id(claims.sub).await?
    } else {
        None
    };

    Ok(Json(CheckAuthResponse {
        authenticated: user.is_some(),
        user: user.map(Into::into),
    }))
}

#[utoipa::path(
    post,
    path = "/api/forgot-password",
    tag = "auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset token issued", body = MessageResponse),
        (status = 422, description = "Unknown email", body = ErrorResponse)
    )
)]
pub async fn forgot_password(
    State(state): State<AuthState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut errors = ValidationError::new();
    check_email(&mut errors, &body.email);
    errors.into_result()?;

    let user = state
        .user_repository
        .find_by_email(body.email.trim())
        .await?
        .ok_or_else(|| {
            ValidationError::field("email", "We can't find a user with that email address.")
        })?;

    issue_user_token(&state, user.id, UserTokenKind::PasswordReset, PASSWORD_RESET_TTL).await?;

    Ok(Json(MessageResponse::new(
        "We have emailed your password reset link.",
    )))
}

#[utoipa::path(
    post,
    path = "/api/reset-password",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced, every session revoked", body = MessageResponse),
        (status = 422, description = "Invalid token or password", body = ErrorResponse)
    )
)]
pub async fn reset_password(
    State(state): State<AuthState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut errors = ValidationError::new();
    check_email(&mut errors, &body.email);
    check_required(&mut errors, "token", &body.token);
    check_new_password(&mut errors, &body.password, &body.password_confirmation);
    errors.into_result()?;

    let invalid = || ValidationError::field("email", "This password reset token is invalid.");

    let user = state
        .user_repository
        .find_by_email(body.email.trim())
        .await?
        .ok_or_else(invalid)?;

    find_user_token(&state, UserTokenKind::PasswordReset, &body.token)
        .await?
        .filter(|row| row.user_id == user.id)
        .ok_or_else(invalid)?;

    let hash_password = state
        .auth_service
        .hash(&body.password)
        .map_err(|e| anyhow!("Failed to hash password: {}", e))?;

    let mut tx = state.user_repository.get_pool().begin().await?;
    state
        .user_repository
        .update_password(user.id, &hash_password, &mut tx)
        .await?;
    state
        .user_token_repository
        .delete_by_user(user.id, UserTokenKind::PasswordReset, &mut tx)
        .await?;
    let revoked = state
        .access_token_repository
        .delete_by_user(user.id, &mut tx)
        .await?;
    tx.commit().await?;

    tracing::info!(user_id = user.id, revoked, "password reset");

    Ok(Json(MessageResponse::new("Your password has been reset.")))
}

#[utoipa::path(
    post,
    path = "/api/email/verify",
    tag = "auth",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email address verified", body = MessageResponse),
        (status = 422, description = "Invalid or expired token", body = ErrorResponse)
    )
)]
pub async fn verify_email(
    State(state): State<AuthState>,
    Json(body): Json<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut errors = ValidationError::new();
    check_required(&mut errors, "token", &body.token);
    errors.into_result()?;

    let row = find_user_token(&state, UserTokenKind::EmailVerification, &body.token)
        .await?
        .ok_or_else(|| ValidationError::field("token", "This verification token is invalid."))?;

    let mut tx = state.user_repository.get_pool().begin().await?;
    state
        .user_repository
        .mark_email_verified(row.user_id, OffsetDateTime::now_utc(), &mut tx)
        .await?;
    state
        .user_token_repository
        .delete_by_user(row.user_id, UserTokenKind::EmailVerification, &mut tx)
        .await?;
    tx.commit().await?;

    tracing::info!(user_id = row.user_id, "email verified");

    Ok(Json(MessageResponse::new("Email verified successfully")))
}

#[utoipa::path(
    post,
    path = "/api/email/resend",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Verification token reissued, or already verified", body = MessageResponse),
        (status = 401, description = "Unauthenticated", body = ErrorResponse)
    )
)]
pub async fn resend_verification(
    Extension(claims): Extension<TokenClaims>,
    State(state): State<AuthState>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    if user.email_verified_at.is_some() {
        return Ok(Json(MessageResponse::new("Email already verified")));
    }

    issue_user_token(
        &state,
        user.id,
        UserTokenKind::EmailVerification,
        EMAIL_VERIFICATION_TTL,
    )
    .await?;

    Ok(Json(MessageResponse::new("Verification link sent")))
}

#[utoipa::path(
    put,
    path = "/api/profile",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 401, description = "Unauthenticated", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    )
)]
pub async fn update_profile(
    Extension(claims): Extension<TokenClaims>,
    State(state): State<AuthState>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let mut user = state
        .user_repository
        .find_by_id(claims.sub)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    let email = body.email.trim().to_string();

    let mut errors = ValidationError::new();
    check_required(&mut errors, "name", &body.name);
    if check_email(&mut errors, &email) && email != user.email {
        if let Some(owner) = state.user_repository.find_by_email(&email).await? {
            if owner.id != user.id {
                errors.add("email", "The email has already been taken.");
            }
        }
    }
    errors.into_result()?;

    if email != user.email {
        // A new address has to be verified again.
        user.email_verified_at = None;
    }
    user.name = body.name.trim().to_string();
    user.email = email;
    user.phone = body.phone.filter(|phone| !phone.trim().is_empty());

    let mut tx = state.user_repository.get_pool().begin().await?;
    state
        .user_repository
        .update_profile(user.id, &user, &mut tx)
        .await?;
    tx.commit().await?;

    let updated = state
        .user_repository
        .find_by_id(user.id)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    Ok(Json(ProfileResponse {
        message: String::from("Profile updated successfully"),
        user: updated.into(),
    }))
}

#[utoipa::path(
    put,
    path = "/api/change-password",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 401, description = "Unauthenticated", body = ErrorResponse),
        (status = 422, description = "Wrong current password or invalid new password", body = ErrorResponse)
    )
)]
pub async fn change_password(
    Extension(claims): Extension<TokenClaims>,
    State(state): State<AuthState>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut errors = ValidationError::new();
    check_required(&mut errors, "current_password", &body.current_password);
    check_new_password(&mut errors, &body.password, &body.password_confirmation);
    errors.into_result()?;

    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    let verified = state
        .auth_service
        .verify(&user, &body.current_password)
        .map_err(|e| anyhow!("Failed to verify password: {}", e))?;

    if !verified {
        return Err(
            ValidationError::field("current_password", "The current password is incorrect.").into(),
        );
    }

    let hash_password = state
        .auth_service
        .hash(&body.password)
        .map_err(|e| anyhow!("Failed to hash password: {}", e))?;

    let mut tx = state.user_repository.get_pool().begin().await?;
    state
        .user_repository
        .update_password(user.id, &hash_password, &mut tx)
        .await?;
    tx.commit().await?;

    tracing::info!(user_id = user.id, "password changed");

    Ok(Json(MessageResponse::new("Password changed successfully")))
}
