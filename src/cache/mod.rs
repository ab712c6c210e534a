// 缓存模块
// 包含会话缓存键, 数据结构与存储实现

pub mod keys;
pub mod models;
pub mod operations;
pub mod store;

// 重新导出常用类型, 方便其他模块使用
pub use models::session::{ApiTokenIndexRecord, SessionRecord};
pub use operations::{MemorySessionStore, RedisSessionStore, StoreOp};
pub use store::SessionStore;
