mod cache;
mod kv;

pub mod error;
pub use cache::{KVCache, RecordCache};
use error::Result;
use faststr::FastStr;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use tracing::debug;

/// SQLite-backed key/value records with a read-through cache in front.
#[derive(Clone)]
pub struct Storage<C> {
    pool:  SqlitePool,
    cache: C,
}

impl<C: KVCache<FastStr>> Storage<C> {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        debug!("Connecting to database: {}", database_url);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// A private in-memory database. SQLite gives every connection its own
    /// memory database, so the pool holds exactly one and never recycles it.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::from_pool(pool).await
    }

    /// Wraps an existing pool, applying pending migrations first.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("../../migrations").run(&pool).await?;

        Ok(Self {
            pool,
            cache: C::init(),
        })
    }
}
