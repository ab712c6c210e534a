/// 缓存操作
/// 提供会话存储的具体实现

// Redis 会话存储
pub mod redis_store;

// 内存会话存储
pub mod memory_store;

pub use memory_store::{MemorySessionStore, StoreOp};
pub use redis_store::RedisSessionStore;
