/// 缓存数据模型
/// 定义会话与 API 令牌索引在哈希中的结构
pub mod session;

pub use session::*;
