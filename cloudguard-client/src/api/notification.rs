use cloudguard_api::models::{Id, NotificationResponse};

use super::ApiClient;
use crate::error::Result;

impl ApiClient {
    pub async fn notifications(&self) -> Result<Vec<NotificationResponse>> {
        let url = self.url("/notifications");
        let response = self.send_authorized(|| self.http.get(&url)).await?;

        Self::decode(response).await
    }

    pub async fn mark_notification_read(&self, id: Id) -> Result<()> {
        let url = self.url(&format!("/notifications/{id}/read"));
        let response = self.send_authorized(|| self.http.post(&url)).await?;

        Self::expect_success(response).await
    }

    pub async fn mark_all_notifications_read(&self) -> Result<()> {
        let url = self.url("/notifications/read-all");
        let response = self.send_authorized(|| self.http.post(&url)).await?;

        Self::expect_success(response).await
    }

    pub async fn delete_notification(&self, id: Id) -> Result<()> {
        let url = self.url(&format!("/notifications/{id}"));
        let response = self.send_authorized(|| self.http.delete(&url)).await?;

        Self::expect_success(response).await
    }

    pub async fn clear_notifications(&self) -> Result<()> {
        let url = self.url("/notifications");
        let response = self.send_authorized(|| self.http.delete(&url)).await?;

        Self::expect_success(response).await
    }
}
