use std::sync::Arc;

use sqlx::{Error, Sqlite, Transaction};

use crate::configs::Storage;
use crate::models::{UserToken, UserTokenKind};

#[derive(Clone)]
pub struct UserTokenRepository {
    storage: Arc<Storage>,
}

impl UserTokenRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

impl UserTokenRepository {
    pub async fn create(
        &self,
        item: &UserToken,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<i32, Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO user_tokens (user_id, kind, token, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(item.user_id)
        .bind(&item.kind)
        .bind(&item.token)
        .bind(item.expires_at)
        .bind(item.created_at)
        .execute(&mut **transaction)
        .await?
        .last_insert_rowid();

        Ok(id as i32)
    }

    pub async fn find(&self, kind: UserTokenKind, token: &str) -> Result<Option<UserToken>, Error> {
        sqlx::query_as("SELECT * FROM user_tokens WHERE kind = $1 AND token = $2")
            .bind(kind.as_str())
            .bind(token)
            .fetch_optional(self.storage.get_pool())
            .await
    }

    pub async fn delete_by_user(
        &self,
        user_id: i32,
        kind: UserTokenKind,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query("DELETE FROM user_tokens WHERE user_id = $1 AND kind = $2")
            .bind(user_id)
            .bind(kind.as_str())
            .execute(&mut **transaction)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, OffsetDateTime};

    use crate::repositories::test_support::{insert_user, setup_test_db};

    use super::*;

    #[tokio::test]
    async fn test_tokens_are_scoped_by_kind() {
        let storage = setup_test_db().await;
        let user_id = insert_user(&storage, "scoped@example.com").await;
        let repo = UserTokenRepository::new(storage.clone());
        let now = OffsetDateTime::now_utc();

        let mut tx = storage.get_pool().begin().await.unwrap();
        repo.create(
            &UserToken {
                id: 0,
                user_id,
                kind: UserTokenKind::PasswordReset.to_string(),
                token: String::from("reset-me"),
                expires_at: now + Duration::hours(1),
                created_at: now,
            },
            &mut tx,
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert!(repo
            .find(UserTokenKind::PasswordReset, "reset-me")
            .await
            .unwrap()
            .is_some());
        assert!(repo
            .find(UserTokenKind::EmailVerification, "reset-me")
            .await
            .unwrap()
            .is_none());

        let mut tx = storage.get_pool().begin().await.unwrap();
        repo.delete_by_user(user_id, UserTokenKind::PasswordReset, &mut tx)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(repo
            .find(UserTokenKind::PasswordReset, "reset-me")
            .await
            .unwrap()
            .is_none());
    }
}
