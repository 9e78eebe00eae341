// src/storage/sqlite.rs

use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::{error::ClientError, storage::KeyValueStore};

/// SQLite-backed durable store.
///
/// A single connection keeps read-modify-write sequences from one client
/// serialized, which is all the locking this storage needs.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `url` and applies migrations.
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await?;

        tracing::debug!("Running storage migrations...");
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

const UPSERT: &str = r#"
    INSERT INTO client_storage (key, value)
    VALUES (?, ?)
    ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = CURRENT_TIMESTAMP
"#;

const DELETE: &str = "DELETE FROM client_storage WHERE key = ?";

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM client_storage WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to read storage key {}: {:?}", key, e);
                ClientError::from(e)
            })?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        sqlx::query(UPSERT)
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to write storage key {}: {:?}", key, e);
                ClientError::from(e)
            })?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), ClientError> {
        sqlx::query(DELETE).bind(key).execute(&self.pool).await?;
        Ok(())
    }

    async fn set_many(&self, entries: &[(&str, String)]) -> Result<(), ClientError> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in entries {
            sqlx::query(UPSERT)
                .bind(*key)
                .bind(value.as_str())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<(), ClientError> {
        let mut tx = self.pool.begin().await?;
        for key in keys {
            sqlx::query(DELETE).bind(*key).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
