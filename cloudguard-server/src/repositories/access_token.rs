use std::sync::Arc;

use sqlx::{Error, Sqlite, Transaction};

use crate::configs::Storage;
use crate::models::AccessToken;

#[derive(Clone)]
pub struct AccessTokenRepository {
    storage: Arc<Storage>,
}

impl AccessTokenRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

impl AccessTokenRepository {
    pub async fn create(
        &self,
        item: &AccessToken,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<i32, Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO access_tokens (user_id, jti, device_name, refresh_token, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(item.user_id)
        .bind(&item.jti)
        .bind(&item.device_name)
        .bind(&item.refresh_token)
        .bind(item.expires_at)
        .bind(item.created_at)
        .execute(&mut **transaction)
        .await?
        .last_insert_rowid();

        Ok(id as i32)
    }

    pub async fn find_by_jti(&self, jti: &str) -> Result<Option<AccessToken>, Error> {
        sqlx::query_as("SELECT * FROM access_tokens WHERE jti = $1")
            .bind(jti)
            .fetch_optional(self.storage.get_pool())
            .await
    }

    pub async fn find_by_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<Option<AccessToken>, Error> {
        sqlx::query_as("SELECT * FROM access_tokens WHERE refresh_token = $1")
            .bind(refresh_token)
            .fetch_optional(self.storage.get_pool())
            .await
    }

    /// Points the session at a newly minted JWT; the previous one stops
    /// resolving immediately.
    pub async fn rotate_jti(&self, id: i32, jti: &str) -> Result<(), Error> {
        sqlx::query("UPDATE access_tokens SET jti = $1 WHERE id = $2")
            .bind(jti)
            .bind(id)
            .execute(self.storage.get_pool())
            .await?;

        Ok(())
    }

    pub async fn delete_by_jti(&self, jti: &str) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE jti = $1")
            .bind(jti)
            .execute(self.storage.get_pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_by_user(
        &self,
        user_id: i32,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM access_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut **transaction)
            .await?;

        Ok(result.rows_affected())
    }
}
