use crate::cache::KVCache;
use crate::{Storage, error::Result};
use faststr::FastStr;
use tracing::debug;

impl<C: KVCache<FastStr>> Storage<C> {
    pub async fn get(&self, key: &str) -> Result<Option<FastStr>> {
        if let Some(value) = self.cache.lookup(key).await {
            return Ok(Some(value));
        }

        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM kv_store WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        let value = value.map(FastStr::from);
        if let Some(ref v) = value {
            self.cache.store(key, v.clone()).await;
        }
        Ok(value)
    }

    pub async fn put(&self, key: &str, value: impl Into<FastStr>) -> Result<()> {
        let value = value.into();
        sqlx::query(
            r#"
        INSERT INTO kv_store (key, value, updated_at)
        VALUES (?1, ?2, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value.as_str())
        .execute(&self.pool)
        .await?;

        debug!(key, bytes = value.len(), "record stored");
        self.cache.store(key, value).await;
        Ok(())
    }

    /// Returns whether a record existed.
    pub async fn remove(&self, key: &str) -> Result<bool> {
        let res = sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        self.cache.evict(key).await;
        Ok(res.rows_affected() > 0)
    }
}
