use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use redis::{ErrorKind, RedisError, RedisResult};
use tokio::time::Instant;

use crate::cache::store::{SessionStore, ttl_millis};

/// 可注入故障的存储命令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    HashSet,
    Expire,
    Exists,
    HashGet,
    HashGetAll,
    Keys,
    Delete,
}

#[derive(Debug, Default)]
struct Entry {
    fields: HashMap<String, String>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    failing: HashSet<StoreOp>,
}

impl Inner {
    fn check(&self, op: StoreOp) -> RedisResult<()> {
        if self.failing.contains(&op) {
            return Err(RedisError::from((
                ErrorKind::IoError,
                "memory store failure",
                format!("{:?} is failing", op),
            )));
        }
        Ok(())
    }

    /// 惰性清除已过期的键
    fn live(&mut self, key: &str) -> Option<&mut Entry> {
        let now = Instant::now();
        if self.entries.get(key).is_some_and(|e| e.is_expired(now)) {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    fn purge_expired(&mut self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
    }
}

/// 内存会话存储
///
/// 与 Redis 行为保持一致: HSET 按字段合并, 每个键独立过期, `keys` 支持
/// `*`/`?` 通配, 不存在的键读取为空而不是错误.
/// 时间取自 `tokio::time`, 测试中可以暂停时钟控制过期.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 之后每次 `op` 都返回错误, 直到调用 [`heal`](Self::heal)
    pub fn fail_on(&self, op: StoreOp) {
        self.lock().failing.insert(op);
    }

    pub fn heal(&self) {
        self.lock().failing.clear();
    }

    /// 剩余存活时间; 键不存在或没有过期时间时返回 `None`
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let mut inner = self.lock();
        let deadline = inner.live(key)?.expires_at?;
        Some(deadline.saturating_duration_since(Instant::now()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().live(key).is_some()
    }

    pub fn field(&self, key: &str, field: &str) -> Option<String> {
        self.lock().live(key)?.fields.get(field).cloned()
    }

    pub fn len(&self) -> usize {
        let mut inner = self.lock();
        inner.purge_expired();
        inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn hset_multiple(&self, key: &str, fields: &[(&'static str, String)]) -> RedisResult<()> {
        let mut inner = self.lock();
        inner.check(StoreOp::HashSet)?;

        if inner.live(key).is_none() {
            inner.entries.insert(key.to_string(), Entry::default());
        }
        if let Some(entry) = inner.entries.get_mut(key) {
            for (field, value) in fields {
                entry.fields.insert(field.to_string(), value.clone());
            }
        }
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> RedisResult<()> {
        let mut inner = self.lock();
        inner.check(StoreOp::Expire)?;

        // 与 Redis 一致: 按毫秒向上取整, 超出范围时报错而不是 panic
        let millis = ttl_millis(ttl)?;
        let deadline = Instant::now()
            .checked_add(Duration::from_millis(millis as u64))
            .ok_or_else(|| {
                RedisError::from((
                    ErrorKind::InvalidClientConfig,
                    "ttl out of range",
                    format!("{:?} overflows the clock", ttl),
                ))
            })?;

        if let Some(entry) = inner.live(key) {
            entry.expires_at = Some(deadline);
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> RedisResult<bool> {
        let mut inner = self.lock();
        inner.check(StoreOp::Exists)?;

        Ok(inner.live(key).is_some())
    }

    async fn hget(&self, key: &str, field: &str) -> RedisResult<Option<String>> {
        let mut inner = self.lock();
        inner.check(StoreOp::HashGet)?;

        Ok(inner.live(key).and_then(|e| e.fields.get(field).cloned()))
    }

    async fn hgetall(&self, key: &str) -> RedisResult<HashMap<String, String>> {
        let mut inner = self.lock();
        inner.check(StoreOp::HashGetAll)?;

        Ok(inner.live(key).map(|e| e.fields.clone()).unwrap_or_default())
    }

    async fn keys(&self, pattern: &str) -> RedisResult<Vec<String>> {
        let mut inner = self.lock();
        inner.check(StoreOp::Keys)?;

        inner.purge_expired();
        let mut keys: Vec<String> = inner
            .entries
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn del(&self, keys: &[String]) -> RedisResult<usize> {
        let mut inner = self.lock();
        inner.check(StoreOp::Delete)?;

        let mut removed = 0;
        for key in keys {
            if inner.live(key).is_some() {
                inner.entries.remove(key);
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Redis 风格的通配匹配, 支持 `*` 和 `?`
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, t));
            p += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&'static str, &str)]) -> Vec<(&'static str, String)> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("session:org:1:user:*", "session:org:1:user:5"));
        assert!(glob_match("session:org:1:user:*", "session:org:1:user:"));
        assert!(!glob_match("session:org:1:user:*", "session:org:12:user:5"));
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "ac"));
        assert!(glob_match("*:user:*", "session:org:3:user:9"));
        assert!(!glob_match("apiToken:*", "session:org:1:user:1"));
    }

    #[tokio::test]
    async fn test_hset_merges_fields() {
        let store = MemorySessionStore::new();
        store
            .hset_multiple("h", &fields(&[("a", "1"), ("b", "2")]))
            .await
            .unwrap();
        store.hset_multiple("h", &fields(&[("b", "3")])).await.unwrap();

        let all = store.hgetall("h").await.unwrap();
        assert_eq!(all.get("a").map(String::as_str), Some("1"));
        assert_eq!(all.get("b").map(String::as_str), Some("3"));
    }

    #[tokio::test]
    async fn test_missing_keys_read_as_absent() {
        let store = MemorySessionStore::new();
        assert!(!store.exists("nope").await.unwrap());
        assert_eq!(store.hget("nope", "f").await.unwrap(), None);
        assert!(store.hgetall("nope").await.unwrap().is_empty());
        assert_eq!(store.del(&["nope".to_string()]).await.unwrap(), 0);
        // 不存在的键设置过期时间不会创建键
        store.expire("nope", Duration::from_secs(5)).await.unwrap();
        assert!(!store.contains_key("nope"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry() {
        let store = MemorySessionStore::new();
        store.hset_multiple("h", &fields(&[("a", "1")])).await.unwrap();
        store.expire("h", Duration::from_secs(10)).await.unwrap();
        assert_eq!(store.ttl("h"), Some(Duration::from_secs(10)));

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(store.exists("h").await.unwrap());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!store.exists("h").await.unwrap());
        assert!(store.keys("*").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rewrite_after_expiry_starts_fresh() {
        let store = MemorySessionStore::new();
        store.hset_multiple("h", &fields(&[("a", "1")])).await.unwrap();
        store.expire("h", Duration::from_secs(1)).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        store.hset_multiple("h", &fields(&[("b", "2")])).await.unwrap();
        assert_eq!(store.field("h", "a"), None);
        assert_eq!(store.ttl("h"), None);
    }

    #[tokio::test]
    async fn test_keys_and_bulk_delete() {
        let store = MemorySessionStore::new();
        for key in ["session:org:1:user:1", "session:org:1:user:2", "session:org:2:user:1"] {
            store.hset_multiple(key, &fields(&[("org", "x")])).await.unwrap();
        }

        let keys = store.keys("session:org:1:user:*").await.unwrap();
        assert_eq!(keys, vec!["session:org:1:user:1", "session:org:1:user:2"]);
        assert_eq!(store.del(&keys).await.unwrap(), 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_expire_out_of_range_errors_without_panic() {
        let store = MemorySessionStore::new();
        store.hset_multiple("h", &fields(&[("a", "1")])).await.unwrap();

        let err = store.expire("h", Duration::MAX).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidClientConfig);
        assert!(store.contains_key("h"));
        assert_eq!(store.ttl("h"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_millisecond_ttl_rounds_up() {
        let store = MemorySessionStore::new();
        store.hset_multiple("h", &fields(&[("a", "1")])).await.unwrap();
        store.expire("h", Duration::from_nanos(1)).await.unwrap();
        assert_eq!(store.ttl("h"), Some(Duration::from_millis(1)));

        // 零 TTL 与 PEXPIRE 0 一样立即删除
        store.expire("h", Duration::ZERO).await.unwrap();
        assert!(!store.contains_key("h"));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemorySessionStore::new();
        store.fail_on(StoreOp::Exists);
        assert!(store.exists("h").await.is_err());
        assert!(store.hget("h", "f").await.is_ok());

        store.heal();
        assert!(store.exists("h").await.is_ok());
    }
}
