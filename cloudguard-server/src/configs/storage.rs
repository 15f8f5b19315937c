use std::path::Path;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Error, SqlitePool};

use crate::configs::schema::SchemaManager;
use crate::configs::settings::Database;

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(database: Database, schema_manager: SchemaManager) -> Result<Self, Error> {
        let pool = SqlitePoolOptions::new()
            .min_connections(1) // an in-memory database vanishes with its last connection
            .max_connections(if database.url.contains(":memory:") { 1 } else { 10 })
            .connect(&database.url)
            .await?;

        Self::create_schema(&pool, &schema_manager, &database).await?;

        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn create_schema(
        pool: &SqlitePool,
        schema: &SchemaManager,
        database: &Database,
    ) -> Result<(), Error> {
        if database.clean_start {
            let statements = [schema.dispose_schema(), schema.create_schema()].concat();

            sqlx::query("DROP TABLE IF EXISTS _sqlx_migrations")
                .execute(pool)
                .await?;

            sqlx::query(&statements.join("\n")).execute(pool).await?;

            tracing::warn!("clean start: schema dropped and recreated");
        } else {
            sqlx::query(&schema.create_schema().join("\n"))
                .execute(pool)
                .await?;
        }

        if let Some(migration_path) = &database.migration_path {
            let mut connection = pool.acquire().await?;
            let migrator = Migrator::new(Path::new(migration_path)).await?;
            migrator.run(&mut connection).await?;

            tracing::info!("database migration finished");
        }

        Ok(())
    }
}
