//! Redis distributed tier using a bb8 connection pool.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisError};

use crate::cache::{CacheError, DistributedTier};
use crate::config::settings::RedisCacheConfig;

type RedisPool = Pool<Client>;

/// Redis-backed distributed tier.
///
/// Every logical key is stored as `{key_prefix}:{key}`. Pool checkout and the command
/// together are bounded by `command_timeout_ms`, so an unreachable server costs each
/// call at most that long.
pub struct RedisTier {
    pool: RedisPool,
    key_prefix: String,
    command_timeout: Duration,
}

impl RedisTier {
    pub async fn new(config: &RedisCacheConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        // Connections are established lazily so that the service can start while
        // Redis is down; reads then degrade to the local tier and the loader.
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .min_idle(Some(0))
            .connection_timeout(Duration::from_secs(config.connection_timeout))
            .build_unchecked(client);

        Ok(Self {
            pool,
            key_prefix: config.key_prefix.clone(),
            command_timeout: Duration::from_millis(config.command_timeout_ms),
        })
    }

    fn prefixed_key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }

    fn strip_prefix<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.key_prefix.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
    }

    async fn get_conn(&self) -> Result<PooledConnection<'_, Client>, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }

    /// Run a checkout-plus-command future under the command timeout.
    async fn bounded<T, F>(&self, operation: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        tokio::time::timeout(self.command_timeout, operation)
            .await
            .unwrap_or(Err(CacheError::Timeout(self.command_timeout)))
    }
}

fn unavailable(error: RedisError) -> CacheError {
    CacheError::Unavailable(error.to_string())
}

#[async_trait]
impl DistributedTier for RedisTier {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let prefixed = self.prefixed_key(key);
        self.bounded(async {
            let mut conn = self.get_conn().await?;
            let conn_ref: &mut MultiplexedConnection = &mut conn;
            conn_ref
                .get::<_, Option<Vec<u8>>>(&prefixed)
                .await
                .map_err(unavailable)
        })
        .await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> Result<(), CacheError> {
        let prefixed = self.prefixed_key(key);
        self.bounded(async {
            let mut conn = self.get_conn().await?;
            let conn_ref: &mut MultiplexedConnection = &mut conn;
            conn_ref
                .set_ex::<_, _, ()>(&prefixed, value, ttl_seconds.max(1))
                .await
                .map_err(unavailable)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let prefixed = self.prefixed_key(key);
        self.bounded(async {
            let mut conn = self.get_conn().await?;
            let conn_ref: &mut MultiplexedConnection = &mut conn;
            conn_ref.del::<_, ()>(&prefixed).await.map_err(unavailable)
        })
        .await
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let prefixed = self.prefixed_key(pattern);
        let keys: Vec<String> = self
            .bounded(async {
                let mut conn = self.get_conn().await?;
                let conn_ref: &mut MultiplexedConnection = &mut conn;
                redis::cmd("KEYS")
                    .arg(&prefixed)
                    .query_async(conn_ref)
                    .await
                    .map_err(unavailable)
            })
            .await?;

        Ok(keys
            .iter()
            .filter_map(|key| self.strip_prefix(key))
            .map(str::to_string)
            .collect())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }

        let prefixed: Vec<String> = keys.iter().map(|key| self.prefixed_key(key)).collect();
        self.bounded(async {
            let mut conn = self.get_conn().await?;
            let conn_ref: &mut MultiplexedConnection = &mut conn;
            conn_ref.del::<_, ()>(prefixed).await.map_err(unavailable)
        })
        .await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.bounded(async {
            let mut conn = self.get_conn().await?;
            let conn_ref: &mut MultiplexedConnection = &mut conn;
            redis::cmd("PING")
                .query_async::<String>(conn_ref)
                .await
                .map(|_| ())
                .map_err(unavailable)
        })
        .await
    }
}
