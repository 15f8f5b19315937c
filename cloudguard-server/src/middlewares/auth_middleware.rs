use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, header};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, Header};

use crate::errors::{ApiError, AuthError};
use crate::repositories::AccessTokenRepository;
use crate::services::{TokenClaims, TokenService};

#[derive(Clone)]
pub struct TokenState {
    pub token_service: Arc<TokenService>,
    pub access_token_repository: Arc<AccessTokenRepository>,
}

impl TokenState {
    /// The bearer credential of `headers`, if one was sent.
    pub fn bearer(headers: &HeaderMap) -> Option<Authorization<Bearer>> {
        let mut values = headers.get_all(header::AUTHORIZATION).iter();
        Authorization::decode(&mut values).ok()
    }

    /// Checks the signature and expiry of `token`.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.token_service
            .retrieve_token_claims(token)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("rejected bearer token: {}", e);
                AuthError::Unauthenticated
            })
    }

    /// Whether the session row behind `claims` still exists.
    pub async fn is_live(&self, claims: &TokenClaims) -> Result<bool, sqlx::Error> {
        let live = self
            .access_token_repository
            .find_by_jti(&claims.jti)
            .await?
            .is_some();

        if !live {
            tracing::debug!(jti = %claims.jti, "bearer token was revoked");
        }

        Ok(live)
    }

    /// Resolves the bearer token to live claims. A token whose session row
    /// has been revoked is rejected even if its signature is still valid.
    pub async fn resolve(&self, headers: &HeaderMap) -> Result<TokenClaims, ApiError> {
        let header = Self::bearer(headers).ok_or(AuthError::Unauthenticated)?;
        let claims = self.verify(header.token())?;

        if !self.is_live(&claims).await? {
            return Err(AuthError::Unauthenticated.into());
        }

        Ok(claims)
    }
}

pub async fn auth(
    State(state): State<TokenState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let claims = state.resolve(req.headers()).await?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
