//! Redis cache backend.
//!
//! Uses a single multiplexed connection, opened on first use and dropped
//! after any failed command so the next call reconnects. Pattern deletes walk
//! the keyspace with `SCAN MATCH` rather than `KEYS`.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisError};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::store::{CacheError, CacheStore};

const BACKEND: &str = "redis";
const SCAN_BATCH: usize = 200;

pub struct RedisCache {
    client: Client,
    connection: Mutex<Option<MultiplexedConnection>>,
}

impl RedisCache {
    /// Validate the URL; no connection is made until the first command.
    pub fn open(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(|err| CacheError::unavailable(BACKEND, err))?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        let mut slot = self.connection.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|err| CacheError::unavailable(BACKEND, err))?;
        info!(backend = BACKEND, "Cache connection established");
        *slot = Some(conn.clone());
        Ok(conn)
    }

    async fn fail(&self, err: RedisError) -> CacheError {
        self.connection.lock().await.take();
        CacheError::unavailable(BACKEND, err)
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let mut conn = self.connection().await?;
        match redis::cmd("GET")
            .arg(key)
            .query_async::<Option<Vec<u8>>>(&mut conn)
            .await
        {
            Ok(value) => Ok(value.map(Bytes::from)),
            Err(err) => Err(self.fail(err).await),
        }
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        match redis::cmd("SET")
            .arg(key)
            .arg(value.as_ref())
            .arg("PX")
            .arg(ttl_ms)
            .query_async::<()>(&mut conn)
            .await
        {
            Ok(()) => Ok(()),
            Err(err) => Err(self.fail(err).await),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        match redis::cmd("DEL").arg(key).query_async::<i64>(&mut conn).await {
            Ok(_) => Ok(()),
            Err(err) => Err(self.fail(err).await),
        }
    }

    async fn delete_matching(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut conn = self.connection().await?;
        let mut cursor = String::from("0");
        let mut removed = 0u64;

        loop {
            let (next, keys) = match redis::cmd("SCAN")
                .arg(&cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async::<(String, Vec<String>)>(&mut conn)
                .await
            {
                Ok(page) => page,
                Err(err) => return Err(self.fail(err).await),
            };

            if !keys.is_empty() {
                match redis::cmd("DEL").arg(&keys).query_async::<u64>(&mut conn).await {
                    Ok(count) => removed += count,
                    Err(err) => return Err(self.fail(err).await),
                }
            }

            if next == "0" {
                break;
            }
            cursor = next;
        }

        debug!(backend = BACKEND, pattern, removed, "Pattern delete complete");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_rejects_malformed_urls() {
        assert!(RedisCache::open("not a url").is_err());
        assert!(RedisCache::open("redis://127.0.0.1:6379/0").is_ok());
    }

    #[tokio::test]
    async fn unreachable_server_reports_unavailable() {
        // Port 1 is never a Redis server.
        let cache = RedisCache::open("redis://127.0.0.1:1/").expect("valid url");
        let err = cache.get("blog:detail:x").await.expect_err("no server");
        assert!(matches!(err, CacheError::Unavailable { backend: "redis", .. }));
    }
}
