use std::error::Error;

use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::configs::Auth;
use crate::models::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub token: String,
    pub jti: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: i32,
    pub email: String,
    /// Identifies the `access_tokens` row backing this token
    pub jti: String,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Clone)]
pub struct TokenService {
    expiration: u64,
    refresh_expiration: u64,
    secret: String,
}

impl TokenService {
    pub fn new(auth: Auth) -> Self {
        Self {
            expiration: auth.expiration,
            refresh_expiration: auth.refresh_expiration,
            secret: auth.secret,
        }
    }

    pub fn retrieve_token_claims(
        &self,
        token: &str,
    ) -> Result<TokenData<TokenClaims>, Box<dyn Error + Send + Sync>> {
        let data = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )?;

        Ok(data)
    }

    pub fn generate_token(&self, user: &User) -> Result<Token, Box<dyn Error + Send + Sync>> {
        let iat = OffsetDateTime::now_utc().unix_timestamp().max(0) as u64;
        let exp = iat + self.expiration;

        let claims = TokenClaims {
            sub: user.id,
            email: user.email.clone(),
            jti: Uuid::new_v4().simple().to_string(),
            iat,
            exp,
        };

        let encoding_key = EncodingKey::from_secret(self.secret.as_ref());

        let token = encode(&Header::default(), &claims, &encoding_key)?;

        Ok(Token {
            token,
            jti: claims.jti,
            iat,
            exp,
        })
    }

    /// Opaque value exchanged at `/auth/refresh`.
    pub fn generate_refresh_token(&self) -> String {
        format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        )
    }

    pub fn refresh_expires_at(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc() + time::Duration::seconds(self.refresh_expiration as i64)
    }
}
