use std::sync::Arc;

use sqlx::{Error, Sqlite, Transaction};

use crate::configs::Storage;
use crate::models::Notification;

/// Every query is scoped to the owning user.
#[derive(Clone)]
pub struct NotificationRepository {
    storage: Arc<Storage>,
}

impl NotificationRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

impl NotificationRepository {
    pub async fn create(
        &self,
        item: &Notification,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<i32, Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, kind, title, message, severity, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(item.user_id)
        .bind(&item.kind)
        .bind(&item.title)
        .bind(&item.message)
        .bind(&item.severity)
        .bind(item.is_read)
        .bind(item.created_at)
        .execute(&mut **transaction)
        .await?
        .last_insert_rowid();

        Ok(id as i32)
    }

    /// Newest first.
    pub async fn find_by_user(&self, user_id: i32) -> Result<Vec<Notification>, Error> {
        sqlx::query_as(
            "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(self.storage.get_pool())
        .await
    }

    pub async fn mark_read(&self, id: i32, user_id: i32) -> Result<bool, Error> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.storage.get_pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_read(&self, user_id: i32) -> Result<u64, Error> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(self.storage.get_pool())
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete(&self, id: i32, user_id: i32) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.storage.get_pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_user(&self, user_id: i32) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .execute(self.storage.get_pool())
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, OffsetDateTime};

    use crate::repositories::test_support::{insert_user, setup_test_db};

    use super::*;

    fn notification(user_id: i32, title: &str, created_at: OffsetDateTime) -> Notification {
        Notification {
            id: 0,
            user_id,
            kind: String::from("rain_detected"),
            title: title.to_string(),
            message: String::from("Rain started"),
            severity: String::from("warning"),
            is_read: false,
            created_at,
        }
    }

    #[tokio::test]
    async fn test_listing_is_newest_first_and_owner_scoped() {
        let storage = setup_test_db().await;
        let owner = insert_user(&storage, "owner@example.com").await;
        let other = insert_user(&storage, "other@example.com").await;
        let repo = NotificationRepository::new(storage.clone());
        let now = OffsetDateTime::now_utc();

        let mut tx = storage.get_pool().begin().await.unwrap();
        repo.create(&notification(owner, "older", now - Duration::hours(1)), &mut tx)
            .await
            .unwrap();
        repo.create(&notification(owner, "newer", now), &mut tx).await.unwrap();
        let foreign = repo
            .create(&notification(other, "foreign", now), &mut tx)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let titles: Vec<_> = repo
            .find_by_user(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.title)
            .collect();
        assert_eq!(titles, vec!["newer", "older"]);

        assert!(!repo.mark_read(foreign, owner).await.unwrap());
        assert!(!repo.delete(foreign, owner).await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_all_and_clear() {
        let storage = setup_test_db().await;
        let owner = insert_user(&storage, "owner@example.com").await;
        let repo = NotificationRepository::new(storage.clone());
        let now = OffsetDateTime::now_utc();

        let mut tx = storage.get_pool().begin().await.unwrap();
        let first = repo.create(&notification(owner, "a", now), &mut tx).await.unwrap();
        repo.create(&notification(owner, "b", now), &mut tx).await.unwrap();
        tx.commit().await.unwrap();

        assert!(repo.mark_read(first, owner).await.unwrap());
        assert_eq!(repo.mark_all_read(owner).await.unwrap(), 1);
        assert!(repo.find_by_user(owner).await.unwrap().iter().all(|n| n.is_read));

        assert_eq!(repo.delete_by_user(owner).await.unwrap(), 2);
        assert!(repo.find_by_user(owner).await.unwrap().is_empty());
    }
}
