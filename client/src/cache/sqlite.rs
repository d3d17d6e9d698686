//! SQLite key-value backend.

use super::KeyValueStore;
use crate::error::CacheError;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

/// Key-value store persisted in a single SQLite table.
#[derive(Debug, Clone)]
pub struct SqliteKeyValue {
    pool: SqlitePool,
}

impl SqliteKeyValue {
    /// Open the database at `database_url` and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and run migrations.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, CacheError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!("Cache migrations applied");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValue {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let row = sqlx::query("SELECT value FROM cache_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => Some(row.try_get("value")?),
            None => None,
        })
    }

    async fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
