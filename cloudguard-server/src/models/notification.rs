use cloudguard_api::models::NotificationResponse;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Table;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i32,
    pub user_id: i32,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub severity: String,
    pub is_read: bool,
    pub created_at: OffsetDateTime,
}

impl From<Notification> for NotificationResponse {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id,
            kind: notification.kind.into(),
            title: notification.title,
            message: notification.message,
            severity: notification.severity.into(),
            is_read: notification.is_read,
            created_at: notification.created_at,
        }
    }
}

#[derive(Clone)]
pub struct NotificationTable;

impl Table for NotificationTable {
    fn name(&self) -> &'static str {
        "notifications"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                kind VARCHAR(32) NOT NULL,
                title VARCHAR(255) NOT NULL,
                message TEXT NOT NULL,
                severity VARCHAR(16) NOT NULL DEFAULT 'info',
                is_read BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMP NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS notifications;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["users"]
    }
}
