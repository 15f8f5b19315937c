use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{Id, DEFAULT_TOKEN_TYPE};

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub email_verified_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn is_email_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub device_name: Option<String>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
    #[serde(default)]
    pub device_name: Option<String>,
}

/// Login and registration success body.
///
/// Backends disagree on the token field name, so both `access_token` and
/// `token` are accepted; use [`AuthResponse::bearer_token`] to read it.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl AuthResponse {
    pub fn bearer_token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .or(self.token.as_deref())
            .filter(|token| !token.is_empty())
    }

    pub fn token_type(&self) -> &str {
        self.token_type.as_deref().unwrap_or(DEFAULT_TOKEN_TYPE)
    }
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckAuthResponse {
    pub authenticated: bool,
    #[serde(default)]
    pub user: Option<User>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyEmailRequest {
    #[serde(default)]
    pub token: String,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResendVerificationRequest {
    #[serde(default)]
    pub email: String,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub message: String,
    pub user: User,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn user_json() -> serde_json::Value {
        json!({
            "id": 7,
            "name": "Ada",
            "email": "ada@example.com",
            "email_verified_at": null,
            "created_at": "2024-05-01T08:30:00Z",
            "updated_at": "2024-05-01T08:30:00.000000Z"
        })
    }

    #[test]
    fn test_user_accepts_missing_optional_fields() {
        let user: User = serde_json::from_value(user_json()).unwrap();

        assert_eq!(user.id, 7);
        assert!(user.phone.is_none());
        assert!(user.avatar.is_none());
        assert!(!user.is_email_verified());
    }

    #[test]
    fn test_auth_response_prefers_access_token() {
        let response: AuthResponse = serde_json::from_value(json!({
            "user": user_json(),
            "access_token": "primary",
            "token": "fallback",
        }))
        .unwrap();

        assert_eq!(response.bearer_token(), Some("primary"));
        assert_eq!(response.token_type(), "Bearer");
    }

    #[test]
    fn test_auth_response_falls_back_to_token() {
        let response: AuthResponse = serde_json::from_value(json!({
            "user": user_json(),
            "token": "fallback",
            "token_type": "bearer",
        }))
        .unwrap();

        assert_eq!(response.bearer_token(), Some("fallback"));
        assert_eq!(response.token_type(), "bearer");
    }

    #[test]
    fn test_auth_response_without_token() {
        let response: AuthResponse = serde_json::from_value(json!({
            "user": user_json(),
            "access_token": "",
        }))
        .unwrap();

        assert!(response.bearer_token().is_none());
    }
}
