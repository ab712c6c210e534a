use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient, RedisResult};

use crate::cache::keys::redacted;
use crate::cache::store::{SessionStore, ttl_millis};

/// 基于 Redis 的会话存储
#[derive(Clone)]
pub struct RedisSessionStore {
    redis: Arc<RedisClient>,
}

impl RedisSessionStore {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self { redis }
    }

    pub fn open(redis_url: &str) -> RedisResult<Self> {
        let client = RedisClient::open(redis_url)?;
        Ok(Self::new(Arc::new(client)))
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn hset_multiple(&self, key: &str, fields: &[(&'static str, String)]) -> RedisResult<()> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        tracing::debug!(key = %redacted(key), fields = fields.len(), "HSET");

        let _: () = conn.hset_multiple(key, fields).await?;

        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> RedisResult<()> {
        // 先换算, 超出范围的 TTL 不发送给 Redis
        let millis = ttl_millis(ttl)?;

        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        tracing::debug!(key = %redacted(key), ttl_ms = millis, "PEXPIRE");

        let _: () = conn.pexpire(key, millis).await?;

        Ok(())
    }

    async fn exists(&self, key: &str) -> RedisResult<bool> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        conn.exists(key).await
    }

    async fn hget(&self, key: &str, field: &str) -> RedisResult<Option<String>> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        conn.hget(key, field).await
    }

    async fn hgetall(&self, key: &str) -> RedisResult<HashMap<String, String>> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        conn.hgetall(key).await
    }

    async fn keys(&self, pattern: &str) -> RedisResult<Vec<String>> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        tracing::debug!(pattern, "KEYS");

        conn.keys(pattern).await
    }

    async fn del(&self, keys: &[String]) -> RedisResult<usize> {
        // DEL 不接受空参数
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        tracing::debug!(count = keys.len(), "DEL");

        conn.del(keys.to_vec()).await
    }
}
