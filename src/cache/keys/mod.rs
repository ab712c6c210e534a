/// 缓存键模块
/// 提供会话相关的缓存键生成函数
pub mod session_keys;

pub use session_keys::{api_token_key, org_sessions_pattern, redacted, session_key};
