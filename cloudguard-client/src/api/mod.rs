mod auth;
mod notification;
mod weather;

pub use auth::*;

use std::sync::Arc;
use std::time::Duration;

use cloudguard_api::models::{ErrorResponse, RefreshRequest, RefreshResponse};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, Result};
use crate::settings::Settings;
use crate::storage::{CredentialKey, CredentialStore};

/// HTTP client for the CloudGuard backend.
///
/// Authenticated requests carry the persisted bearer token. A 401 on such a
/// request triggers at most one refresh followed by one replay; public
/// requests are sent exactly once.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    device_name: String,
    ping_timeout: Duration,
    storage: Arc<dyn CredentialStore>,
}

impl ApiClient {
    pub fn new(settings: &Settings, storage: Arc<dyn CredentialStore>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::unknown(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: settings.api.base_url.trim_end_matches('/').to_string(),
            device_name: settings.api.device_name.clone(),
            ping_timeout: settings.ping_timeout(),
            storage,
        })
    }

    pub fn storage(&self) -> &Arc<dyn CredentialStore> {
        &self.storage
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn bearer_token(&self) -> Option<String> {
        match self.storage.get_item(CredentialKey::Token).await {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!("failed to read bearer token: {}", err);
                None
            }
        }
    }

    async fn send_public(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        tracing::debug!(status = %response.status(), url = %response.url(), "response received");

        Ok(response)
    }

    async fn send_authorized<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut request = build();
        if let Some(token) = self.bearer_token().await {
            request = request.bearer_auth(token);
        }

        let response = self.send_public(request).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if let Some(token) = self.refresh().await {
                return self.send_public(build().bearer_auth(token)).await;
            }
        }

        Ok(response)
    }

    /// Exchanges the persisted refresh token for a new bearer token.
    ///
    /// On failure both tokens are dropped so the caller ends up logged out.
    async fn refresh(&self) -> Option<String> {
        let refresh_token = match self.storage.get_item(CredentialKey::RefreshToken).await {
            Ok(Some(token)) => token,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!("failed to read refresh token: {}", err);
                return None;
            }
        };

        let result = async {
            let request = self
                .http
                .post(self.url("/auth/refresh"))
                .json(&RefreshRequest { refresh_token });
            let body: RefreshResponse = Self::decode(self.send_public(request).await?).await?;
            self.storage.set_item(CredentialKey::Token, &body.token).await?;

            Ok::<_, ApiError>(body.token)
        }
        .await;

        match result {
            Ok(token) => {
                tracing::info!("bearer token refreshed");
                Some(token)
            }
            Err(err) => {
                tracing::warn!("token refresh failed: {}", err);
                for key in [CredentialKey::Token, CredentialKey::RefreshToken] {
                    if let Err(err) = self.storage.remove_item(key).await {
                        tracing::warn!(%key, "failed to drop credential: {}", err);
                    }
                }
                None
            }
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            return Ok(serde_json::from_slice(&bytes)?);
        }

        Err(Self::normalize(status, &bytes))
    }

    async fn expect_success(response: Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let bytes = response.bytes().await?;
        Err(Self::normalize(status, &bytes))
    }

    fn normalize(status: StatusCode, bytes: &[u8]) -> ApiError {
        let body: ErrorResponse = serde_json::from_slice(bytes).unwrap_or_default();
        let first_field_message = body.first_field_message().map(str::to_string);
        let errors = body.errors.unwrap_or_default();

        match status {
            StatusCode::UNAUTHORIZED => ApiError::InvalidCredentials {
                message: body.message.unwrap_or_else(|| "Invalid credentials".into()),
                errors,
            },
            StatusCode::UNPROCESSABLE_ENTITY => ApiError::Validation {
                message: first_field_message
                    .or(body.message)
                    .unwrap_or_else(|| "Validation failed".into()),
                errors,
            },
            _ => {
                let message = body.message.unwrap_or_else(|| {
                    format!(
                        "Server error ({} {})",
                        status.as_u16(),
                        status.canonical_reason().unwrap_or("Unknown")
                    )
                });
                ApiError::server(status.as_u16(), message)
            }
        }
    }
}
