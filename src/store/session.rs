/// Session Store
///
/// Key-value store with per-key expiry. The session manager keeps the
/// active refresh token and the revocation deny-list here. Single-key
/// operations are atomic; there are no multi-key transactions.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use crate::configuration::RedisSettings;
use crate::error::StorageError;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Set `key` to `value`, replacing any previous value, expiring after `ttl`
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StorageError>;

    /// Remove `key`; removing an absent key is not an error
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// Redis-backed session store
///
/// Every command is bounded by `command_timeout`; a command that overruns
/// fails with `StorageError::Timeout` and is not retried.
#[derive(Clone)]
pub struct RedisSessionStore {
    connection: ConnectionManager,
    command_timeout: Duration,
}

impl RedisSessionStore {
    pub async fn connect(settings: &RedisSettings) -> Result<Self, StorageError> {
        let client = redis::Client::open(settings.url.as_str())?;
        let command_timeout = Duration::from_millis(settings.command_timeout_ms);

        let connection = tokio::time::timeout(command_timeout * 10, ConnectionManager::new(client))
            .await
            .map_err(|_| StorageError::Timeout("redis connect".to_string()))??;

        tracing::info!("Session store connection established");
        Ok(Self {
            connection,
            command_timeout,
        })
    }

    async fn with_timeout<T, F>(&self, op: &'static str, fut: F) -> Result<T, StorageError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        bounded(op, self.command_timeout, fut).await
    }
}

/// Run a Redis command, failing with `Timeout` if it overruns `limit`
async fn bounded<T, F>(op: &'static str, limit: Duration, fut: F) -> Result<T, StorageError>
where
    F: Future<Output = redis::RedisResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(|e| {
            tracing::warn!(op, error = %e, "Session store command failed");
            StorageError::from(e)
        }),
        Err(_) => {
            tracing::warn!(op, timeout_ms = limit.as_millis() as u64, "Session store command timed out");
            Err(StorageError::Timeout(op.to_string()))
        }
    }
}

/// `PX` argument for a TTL; Redis rejects a zero expiry
fn expiry_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.connection.clone();
        self.with_timeout("GET", async {
            redis::cmd("GET")
                .arg(key)
                .query_async::<_, Option<String>>(&mut conn)
                .await
        })
        .await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StorageError> {
        let ttl_ms = expiry_millis(ttl);
        let mut conn = self.connection.clone();
        self.with_timeout("SET", async {
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("PX")
                .arg(ttl_ms)
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut conn = self.connection.clone();
        self.with_timeout("DEL", async {
            redis::cmd("DEL")
                .arg(key)
                .query_async::<_, i64>(&mut conn)
                .await
        })
        .await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let mut conn = self.connection.clone();
        self.with_timeout("EXISTS", async {
            redis::cmd("EXISTS")
                .arg(key)
                .query_async::<_, bool>(&mut conn)
                .await
        })
        .await
    }
}
