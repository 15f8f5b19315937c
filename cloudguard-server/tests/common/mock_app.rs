#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use cloudguard_api::models::AuthResponse;
use cloudguard_server::app::create_router;
use cloudguard_server::configs::{Database, SchemaManager, Settings, Storage};
use cloudguard_server::services::TokenClaims;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tempfile::TempDir;
use time::OffsetDateTime;
use tower::ServiceExt;
use wiremock::MockServer;

pub const PASSWORD: &str = "password123";

pub struct MockApp {
    pub storage: Arc<Storage>,
    pub router: Router,
    pub weather: MockServer,
    pub avatar_dir: TempDir,
}

impl MockApp {
    pub async fn new() -> Self {
        let weather = MockServer::start().await;
        let avatar_dir = tempfile::tempdir().unwrap();

        let mut settings = Settings::default();
        settings.database = Database {
            migration_path: None,
            clean_start: true,
            url: String::from("sqlite::memory:"),
        };
        settings.auth.secret = String::from("test");
        settings.weather.base_url = weather.uri();
        settings.weather.api_key = String::from("test-key");
        settings.uploads.avatar_dir = avatar_dir.path().to_string_lossy().into_owned();

        let storage = Arc::new(
            Storage::new(settings.database.clone(), SchemaManager::default())
                .await
                .unwrap(),
        );

        let router = create_router(&settings, storage.clone());

        Self {
            storage,
            router,
            weather,
            avatar_dir,
        }
    }

    /// Sends a request and returns the status with the decoded JSON body,
    /// `Value::Null` when the body is empty.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri).method(method);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.dispatch(request).await
    }

    pub async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, body)
    }

    pub async fn register(&self, name: &str, email: &str) -> AuthResponse {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/register",
                None,
                Some(json!({
                    "name": name,
                    "email": email,
                    "password": PASSWORD,
                    "password_confirmation": PASSWORD,
                    "device_name": "test device",
                })),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED, "{body}");
        serde_json::from_value(body).unwrap()
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Latest single-use token of the given kind, as it would have been mailed.
    pub async fn user_token(&self, user_id: i32, kind: &str) -> String {
        sqlx::query_scalar::<_, String>(
            "SELECT token FROM user_tokens WHERE user_id = $1 AND kind = $2 ORDER BY id DESC LIMIT 1;",
        )
        .bind(user_id)
        .bind(kind)
        .fetch_one(self.storage.get_pool())
        .await
        .unwrap()
    }

    /// Re-signs the newest session of `user_id` with an expiry an hour ago.
    pub async fn expired_token(&self, user_id: i32, email: &str) -> String {
        let jti = sqlx::query_scalar::<_, String>(
            "SELECT jti FROM access_tokens WHERE user_id = $1 ORDER BY id DESC LIMIT 1;",
        )
        .bind(user_id)
        .fetch_one(self.storage.get_pool())
        .await
        .unwrap();

        let now = OffsetDateTime::now_utc().unix_timestamp() as u64;
        let claims = TokenClaims {
            sub: user_id,
            email: email.to_string(),
            jti,
            iat: now - 7200,
            exp: now - 3600,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test"),
        )
        .unwrap()
    }

    pub async fn create_test_notification(&self, user_id: i32, title: &str) -> i32 {
        sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO notifications (user_id, kind, title, message, severity, is_read, created_at)
                VALUES ($1, 'rain_detected', $2, 'Rain started near your clothesline', 'warning', FALSE, $3)
                RETURNING id;
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.storage.get_pool())
        .await
        .unwrap()
    }
}
