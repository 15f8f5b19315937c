#![allow(dead_code)]

use std::sync::Arc;

use cloudguard_client::storage::{CredentialKey, CredentialStore, MemoryStorage};
use cloudguard_client::{ApiClient, Settings, SessionStore};
use serde_json::{Value, json};
use wiremock::MockServer;

pub fn settings(server: &MockServer) -> Settings {
    settings_for(&format!("{}/api", server.uri()))
}

pub fn settings_for(base_url: &str) -> Settings {
    let mut settings = Settings::default();
    settings.api.base_url = base_url.to_string();
    settings.api.timeout = 500;
    settings.api.ping_timeout = 200;
    settings.api.device_name = String::from("test device");
    settings
}

pub fn user_json(id: i32) -> Value {
    json!({
        "id": id,
        "name": "Ada Lovelace",
        "email": "ada@example.com",
        "phone": null,
        "avatar": null,
        "email_verified_at": null,
        "created_at": "2024-05-01T08:30:00Z",
        "updated_at": "2024-05-01T08:30:00Z"
    })
}

pub fn auth_body(id: i32, token: &str) -> Value {
    json!({
        "user": user_json(id),
        "access_token": token,
        "token_type": "Bearer"
    })
}

pub struct TestSession {
    pub store: SessionStore,
    pub storage: Arc<MemoryStorage>,
}

impl TestSession {
    pub fn new(settings: &Settings) -> Self {
        let storage = Arc::new(MemoryStorage::new());
        let api = ApiClient::new(settings, storage.clone()).unwrap();

        Self {
            store: SessionStore::new(api),
            storage,
        }
    }

    pub async fn with_persisted(settings: &Settings, token: &str, user_id: i32) -> Self {
        let session = Self::new(settings);
        session
            .storage
            .set_item(CredentialKey::Token, token)
            .await
            .unwrap();
        session
            .storage
            .set_item(CredentialKey::User, &user_json(user_id).to_string())
            .await
            .unwrap();
        session
    }

    pub async fn persisted(&self, key: CredentialKey) -> Option<String> {
        self.storage.get_item(key).await.unwrap()
    }
}
