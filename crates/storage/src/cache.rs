use faststr::FastStr;
use moka::future::Cache;
use std::{sync::Arc, time::Duration};

pub const DEFAULT_CAPACITY: u64 = 64;
pub const DEFAULT_TTL: Duration = Duration::from_secs(7200);

/// Read-through cache in front of the `kv_store` table. Clones share one
/// set of entries.
pub trait KVCache<V>: Clone + Send + Sync + 'static
where
    V: Clone + Send + Sync + 'static,
{
    fn init() -> Self;

    fn lookup(&self, key: &str) -> impl Future<Output = Option<V>> + Send;

    fn store(&self, key: &str, value: V) -> impl Future<Output = ()> + Send;

    fn evict(&self, key: &str) -> impl Future<Output = ()> + Send;
}

/// Serialized records keyed like the table.
#[derive(Clone)]
pub struct RecordCache(Arc<Cache<FastStr, FastStr>>);

impl Default for RecordCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl RecordCache {
    pub fn with_capacity(capacity: u64, ttl: Duration) -> Self {
        Self(Arc::new(
            Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        ))
    }
}

impl KVCache<FastStr> for RecordCache {
    fn init() -> Self {
        Self::default()
    }

    async fn lookup(&self, key: &str) -> Option<FastStr> {
        self.0.get(key).await
    }

    async fn store(&self, key: &str, value: FastStr) {
        self.0.insert(FastStr::new(key), value).await;
    }

    async fn evict(&self, key: &str) {
        self.0.invalidate(key).await;
    }
}
