use std::sync::Arc;

use sqlx::{Error, Pool, Sqlite, Transaction};
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::models::User;

#[derive(Clone)]
pub struct UserRepository {
    storage: Arc<Storage>,
}

impl UserRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get_pool(&self) -> &Pool<Sqlite> {
        self.storage.get_pool()
    }
}

impl UserRepository {
    pub async fn create(
        &self,
        item: &User,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<i32, Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO users (name, email, password, phone, avatar, email_verified_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&item.name)
        .bind(&item.email)
        .bind(&item.password)
        .bind(&item.phone)
        .bind(&item.avatar)
        .bind(item.email_verified_at)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut **transaction)
        .await?
        .last_insert_rowid();

        Ok(id as i32)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<User>, Error> {
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.storage.get_pool())
            .await?;

        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.storage.get_pool())
            .await?;

        Ok(user)
    }

    /// Writes name, email and phone; the password is never touched here.
    pub async fn update_profile(
        &self,
        id: i32,
        item: &User,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET name = $1, email = $2, phone = $3, email_verified_at = $4, updated_at = $5
            WHERE id = $6
            "#,
        )
        .bind(&item.name)
        .bind(&item.email)
        .bind(&item.phone)
        .bind(item.email_verified_at)
        .bind(OffsetDateTime::now_utc())
        .bind(id)
        .execute(&mut **transaction)
        .await?;

        Ok(())
    }

    pub async fn update_password(
        &self,
        id: i32,
        password: &str,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query("UPDATE users SET password = $1, updated_at = $2 WHERE id = $3")
            .bind(password)
            .bind(OffsetDateTime::now_utc())
            .bind(id)
            .execute(&mut **transaction)
            .await?;

        Ok(())
    }

    pub async fn mark_email_verified(
        &self,
        id: i32,
        verified_at: OffsetDateTime,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query("UPDATE users SET email_verified_at = $1, updated_at = $1 WHERE id = $2")
            .bind(verified_at)
            .bind(id)
            .execute(&mut **transaction)
            .await?;

        Ok(())
    }
}
