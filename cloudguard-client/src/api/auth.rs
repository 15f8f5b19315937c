use cloudguard_api::models::{
    AuthResponse, ChangePasswordRequest, CheckAuthResponse, ForgotPasswordRequest, LoginRequest,
    ProfileResponse, RegisterRequest, ResendVerificationRequest, ResetPasswordRequest,
    UpdateProfileRequest, User, VerifyEmailRequest,
};
use reqwest::multipart::{Form, Part};

use super::ApiClient;
use crate::error::{ApiError, Result};
use crate::storage::CredentialKey;

#[derive(Debug, Clone, Default)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct RegisterCredentials {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    /// JPEG bytes; switches the request to `multipart/form-data`
    pub avatar: Option<Vec<u8>>,
}

/// Normalized login or registration result.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
    pub token_type: String,
}

impl ApiClient {
    /// Probes the backend, never failing.
    pub async fn ping(&self) -> bool {
        let request = self.http.get(self.url("/ping")).timeout(self.ping_timeout);

        match request.send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                tracing::warn!("ping failed: {}", err);
                false
            }
        }
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> Result<AuthSession> {
        tracing::debug!(email = %credentials.email, "logging in");

        let payload = LoginRequest {
            email: credentials.email.clone(),
            password: credentials.password.clone(),
            device_name: Some(self.device_name.clone()),
        };

        let request = self.http.post(self.url("/login")).json(&payload);
        let response: AuthResponse = Self::decode(self.send_public(request).await?).await?;

        self.accept_session(response).await
    }

    pub async fn register(&self, credentials: &RegisterCredentials) -> Result<AuthSession> {
        tracing::debug!(
            email = %credentials.email,
            avatar = credentials.avatar.is_some(),
            "registering"
        );

        let request = self.http.post(self.url("/register"));
        let request = match &credentials.avatar {
            Some(avatar) => request.multipart(self.registration_form(credentials, avatar)?),
            None => request.json(&RegisterRequest {
                name: credentials.name.clone(),
                email: credentials.email.clone(),
                password: credentials.password.clone(),
                password_confirmation: credentials.password_confirmation.clone(),
                device_name: Some(self.device_name.clone()),
            }),
        };

        let response: AuthResponse = Self::decode(self.send_public(request).await?).await?;

        self.accept_session(response).await
    }

    fn registration_form(&self, credentials: &RegisterCredentials, avatar: &[u8]) -> Result<Form> {
        let avatar = Part::bytes(avatar.to_vec())
            .file_name("avatar.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| ApiError::unknown(format!("Invalid avatar part: {e}")))?;

        Ok(Form::new()
            .text("name", credentials.name.clone())
            .text("email", credentials.email.clone())
            .text("password", credentials.password.clone())
            .text("password_confirmation", credentials.password_confirmation.clone())
            .text("device_name", self.device_name.clone())
            .part("avatar", avatar))
    }

    /// Extracts the bearer token and stores the refresh token, if issued.
    async fn accept_session(&self, response: AuthResponse) -> Result<AuthSession> {
        let token = response
            .bearer_token()
            .ok_or_else(|| ApiError::unknown("Server response did not include an access token"))?
            .to_string();
        let token_type = response.token_type().to_string();

        match &response.refresh_token {
            Some(refresh_token) => {
                self.storage
                    .set_item(CredentialKey::RefreshToken, refresh_token)
                    .await?
            }
            None => self.storage.remove_item(CredentialKey::RefreshToken).await?,
        }

        Ok(AuthSession {
            user: response.user,
            token,
            token_type,
        })
    }

    pub async fn logout(&self) -> Result<()> {
        let url = self.url("/logout");
        let response = self.send_authorized(|| self.http.post(&url)).await?;

        Self::expect_success(response).await
    }

    pub async fn check_auth(&self) -> Result<CheckAuthResponse> {
        let url = self.url("/check-auth");
        let response = self.send_authorized(|| self.http.get(&url)).await?;

        Self::decode(response).await
    }

    pub async fn verify_email(&self, token: &str) -> Result<()> {
        let request = self
            .http
            .post(self.url("/email/verify"))
            .json(&VerifyEmailRequest {
                token: token.to_string(),
            });

        Self::expect_success(self.send_public(request).await?).await
    }

    pub async fn resend_verification(&self, email: &str) -> Result<()> {
        let url = self.url("/email/resend");
        let payload = ResendVerificationRequest {
            email: email.to_string(),
        };
        let response = self
            .send_authorized(|| self.http.post(&url).json(&payload))
            .await?;

        Self::expect_success(response).await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let request = self
            .http
            .post(self.url("/forgot-password"))
            .json(&ForgotPasswordRequest {
                email: email.to_string(),
            });

        Self::expect_success(self.send_public(request).await?).await
    }

    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<()> {
        let request = self.http.post(self.url("/reset-password")).json(request);

        Self::expect_success(self.send_public(request).await?).await
    }

    pub async fn update_profile(&self, request: &UpdateProfileRequest) -> Result<User> {
        let url = self.url("/profile");
        let response = self
            .send_authorized(|| self.http.put(&url).json(request))
            .await?;

        let body: ProfileResponse = Self::decode(response).await?;

        Ok(body.user)
    }

    pub async fn change_password(&self, request: &ChangePasswordRequest) -> Result<()> {
        let url = self.url("/change-password");
        let response = self
            .send_authorized(|| self.http.put(&url).json(request))
            .await?;

        Self::expect_success(response).await
    }
}
