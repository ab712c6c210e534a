use redis::RedisError;

pub type SessionResult<T> = Result<T, SessionError>;

/// 会话管理错误
///
/// `InvalidSession` 不携带任何细节: 会话从未存在, 已过期, 或令牌不匹配
/// 都返回同一个值.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("org id is required")]
    MissingOrgId,

    #[error("user id is required")]
    MissingUserId,

    #[error("a bearer token or an api token is required")]
    MissingCredential,

    #[error("invalid session")]
    InvalidSession,

    #[error("cache error while {action}: {source}")]
    Cache {
        action: String,
        #[source]
        source: RedisError,
    },

    #[error("malformed {record} record: field `{field}` is missing or not an integer")]
    MalformedRecord {
        record: &'static str,
        field: &'static str,
    },
}

impl SessionError {
    pub fn is_invalid_session(&self) -> bool {
        matches!(self, SessionError::InvalidSession)
    }

    pub fn is_missing_identity(&self) -> bool {
        matches!(self, SessionError::MissingOrgId | SessionError::MissingUserId)
    }

    /// 缓存调用失败或返回了不可信的数据, 区别于正常的否定结果
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            SessionError::Cache { .. } | SessionError::MalformedRecord { .. }
        )
    }

    pub(crate) fn cache(action: impl Into<String>) -> impl FnOnce(RedisError) -> SessionError {
        let action = action.into();
        move |source| SessionError::Cache { action, source }
    }
}
