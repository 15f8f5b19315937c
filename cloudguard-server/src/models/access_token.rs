use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Table;

/// One issued session. The JWT `jti` and the refresh token both point here,
/// so deleting the row revokes the session.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AccessToken {
    pub id: i32,
    pub user_id: i32,
    pub jti: String,
    pub device_name: String,
    pub refresh_token: String,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AccessTokenTable;

impl Table for AccessTokenTable {
    fn name(&self) -> &'static str {
        "access_tokens"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS access_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                jti VARCHAR(64) NOT NULL UNIQUE,
                device_name VARCHAR(255) NOT NULL,
                refresh_token VARCHAR(64) NOT NULL UNIQUE,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS access_tokens;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["users"]
    }
}
