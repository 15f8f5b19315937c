use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserTokenKind {
    EmailVerification,
    PasswordReset,
}

impl UserTokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserTokenKind::EmailVerification => "email_verification",
            UserTokenKind::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for UserTokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-use token mailed to the user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserToken {
    pub id: i32,
    pub user_id: i32,
    pub kind: String,
    pub token: String,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct UserTokenTable;

impl Table for UserTokenTable {
    fn name(&self) -> &'static str {
        "user_tokens"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS user_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                kind VARCHAR(32) NOT NULL,
                token VARCHAR(64) NOT NULL UNIQUE,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS user_tokens;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["users"]
    }
}
