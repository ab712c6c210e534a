use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::{ErrorKind, RedisError, RedisResult};

/// 共享缓存的最小契约: 哈希读写, 过期时间, 通配枚举与批量删除
///
/// 每个方法都是一次独立的往返请求, 多次调用之间没有原子性保证.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// HSET: 合并写入字段, 已存在的其他字段保持不变
    async fn hset_multiple(&self, key: &str, fields: &[(&'static str, String)]) -> RedisResult<()>;

    /// 设置键的过期时间; 键不存在时无效果
    async fn expire(&self, key: &str, ttl: Duration) -> RedisResult<()>;

    async fn exists(&self, key: &str) -> RedisResult<bool>;

    async fn hget(&self, key: &str, field: &str) -> RedisResult<Option<String>>;

    /// 键不存在时返回空表
    async fn hgetall(&self, key: &str) -> RedisResult<HashMap<String, String>>;

    /// 按通配模式枚举键
    async fn keys(&self, pattern: &str) -> RedisResult<Vec<String>>;

    /// 批量删除, 返回实际删除的键数量
    async fn del(&self, keys: &[String]) -> RedisResult<usize>;
}

/// 将 TTL 转换为 PEXPIRE 的毫秒参数
///
/// 不足 1 毫秒的部分向上取整, 只有零 TTL 会得到 0 (立即过期).
/// 超出 i64 范围时返回错误, 不会截断成负数.
pub fn ttl_millis(ttl: Duration) -> RedisResult<i64> {
    let mut millis = ttl.as_millis();
    if ttl.subsec_nanos() % 1_000_000 != 0 {
        millis += 1;
    }
    i64::try_from(millis).map_err(|_| {
        RedisError::from((
            ErrorKind::InvalidClientConfig,
            "ttl out of range",
            format!("{:?} does not fit a PEXPIRE argument", ttl),
        ))
    })
}
