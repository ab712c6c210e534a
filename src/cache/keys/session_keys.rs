use std::borrow::Cow;

/// 会话缓存键前缀
const SESSION_ORG_PREFIX: &str = "session:org:";

/// API 令牌索引键前缀
const API_TOKEN_PREFIX: &str = "apiToken:";

/// 生成会话缓存键: `session:org:<orgID>:user:<userID>`
pub fn session_key(org_id: i64, user_id: i64) -> String {
    format!("{}{}:user:{}", SESSION_ORG_PREFIX, org_id, user_id)
}

/// 匹配某个租户下全部会话的通配模式
pub fn org_sessions_pattern(org_id: i64) -> String {
    format!("{}{}:user:*", SESSION_ORG_PREFIX, org_id)
}

/// 生成 API 令牌索引键: `apiToken:<token>`
pub fn api_token_key(token: &str) -> String {
    format!("{}{}", API_TOKEN_PREFIX, token)
}

/// 日志用: 隐藏 API 令牌索引键中的令牌值
pub fn redacted(key: &str) -> Cow<'_, str> {
    if key.starts_with(API_TOKEN_PREFIX) {
        Cow::Owned(format!("{}<redacted>", API_TOKEN_PREFIX))
    } else {
        Cow::Borrowed(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(session_key(7, 42), "session:org:7:user:42");
        assert_eq!(org_sessions_pattern(7), "session:org:7:user:*");
        assert_eq!(api_token_key("api-a"), "apiToken:api-a");
    }

    #[test]
    fn test_redacted() {
        assert_eq!(redacted("apiToken:secret"), "apiToken:<redacted>");
        assert_eq!(redacted("session:org:1:user:2"), "session:org:1:user:2");
    }
}
