//! 会话生命周期管理
//!
//! 会话存放在哈希 `session:org:<org>:user:<user>` 中; API 令牌另外在
//! `apiToken:<token>` 建立索引, 以便只凭令牌完成校验. 索引只用于定位,
//! 经由索引的每次查找都要再用会话哈希确认.

use std::time::Duration;

use subtle::ConstantTimeEq;

use crate::cache::keys::{api_token_key, org_sessions_pattern, session_key};
use crate::cache::models::session::{
    ApiTokenIndexRecord, FIELD_API_TOKEN, FIELD_JWT, SessionRecord,
};
use crate::cache::store::{SessionStore, ttl_millis};
use crate::error::{SessionError, SessionResult};

/// API 令牌索引的存活时间, 与会话 TTL 无关
pub const DEFAULT_API_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct SessionAuthority<S> {
    store: S,
    api_token_ttl: Duration,
}

impl<S: SessionStore> SessionAuthority<S> {
    pub fn new(store: S) -> Self {
        Self::with_api_token_ttl(store, DEFAULT_API_TOKEN_TTL)
    }

    pub fn with_api_token_ttl(store: S, api_token_ttl: Duration) -> Self {
        Self {
            store,
            api_token_ttl,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn api_token_ttl(&self) -> Duration {
        self.api_token_ttl
    }

    /// 创建或覆盖 `(org_id, user_id)` 的会话
    ///
    /// 空令牌视为未提供, 两者至少提供一个. `api_token` 的索引使用
    /// [`api_token_ttl`](Self::api_token_ttl), 会话本身存活 `ttl`.
    /// 各次写入是独立的往返请求, 失败时不回滚; 无法表示的 TTL 在写入前拒绝.
    pub async fn create_session(
        &self,
        user_id: i64,
        org_id: i64,
        bearer_token: &str,
        api_token: &str,
        ttl: Duration,
    ) -> SessionResult<()> {
        validate_params(user_id, org_id, bearer_token, api_token)?;
        if !api_token.is_empty() {
            ttl_millis(self.api_token_ttl).map_err(SessionError::cache(format!(
                "setting api token index ttl for org {} user {}",
                org_id, user_id
            )))?;
        }
        ttl_millis(ttl).map_err(SessionError::cache(format!(
            "setting session ttl for org {} user {}",
            org_id, user_id
        )))?;

        if !api_token.is_empty() {
            let index_key = api_token_key(api_token);
            let index = ApiTokenIndexRecord {
                org: org_id,
                user: user_id,
            };
            self.store
                .hset_multiple(&index_key, &index.fields())
                .await
                .map_err(SessionError::cache(format!(
                    "writing api token index for org {} user {}",
                    org_id, user_id
                )))?;
            self.store
                .expire(&index_key, self.api_token_ttl)
                .await
                .map_err(SessionError::cache(format!(
                    "setting api token index ttl for org {} user {}",
                    org_id, user_id
                )))?;
        }

        let key = session_key(org_id, user_id);
        let record = SessionRecord::new(org_id, user_id, bearer_token, api_token);
        self.store
            .hset_multiple(&key, &record.fields())
            .await
            .map_err(SessionError::cache(format!(
                "writing session for org {} user {}",
                org_id, user_id
            )))?;
        self.store
            .expire(&key, ttl)
            .await
            .map_err(SessionError::cache(format!(
                "setting session ttl for org {} user {}",
                org_id, user_id
            )))?;

        Ok(())
    }

    /// 校验该身份存在有效会话, 且存储的 bearer 令牌与 `bearer_token` 相同
    pub async fn validate_jwt_session(
        &self,
        user_id: i64,
        org_id: i64,
        bearer_token: &str,
    ) -> SessionResult<()> {
        validate_params(user_id, org_id, bearer_token, "")?;

        self.check_session_field(org_id, user_id, FIELD_JWT, bearer_token)
            .await
    }

    /// 通过 API 令牌解析出 `(user_id, org_id)`
    ///
    /// 索引只负责定位会话; 会话哈希必须仍然存在并保存同一个令牌.
    pub async fn validate_api_token_session(&self, api_token: &str) -> SessionResult<(i64, i64)> {
        if api_token.is_empty() {
            return Err(SessionError::MissingCredential);
        }

        let fields = self
            .store
            .hgetall(&api_token_key(api_token))
            .await
            .map_err(SessionError::cache("reading api token index"))?;
        if fields.is_empty() {
            return Err(SessionError::InvalidSession);
        }
        let index = ApiTokenIndexRecord::from_fields(&fields)?;

        self.check_session_field(index.org, index.user, FIELD_API_TOKEN, api_token)
            .await?;

        Ok((index.user, index.org))
    }

    /// 删除该身份的会话, 会话不存在不算错误. API 令牌索引等待自身过期.
    pub async fn delete_session(&self, user_id: i64, org_id: i64) -> SessionResult<()> {
        self.store
            .del(&[session_key(org_id, user_id)])
            .await
            .map_err(SessionError::cache(format!(
                "deleting session for org {} user {}",
                org_id, user_id
            )))?;

        Ok(())
    }

    /// 删除 `org_id` 下的全部会话, 返回删除数量
    ///
    /// 枚举是对键空间的扫描; 扫描与删除之间新建的会话不会被删除.
    pub async fn delete_all_org_sessions(&self, org_id: i64) -> SessionResult<usize> {
        let keys = self
            .store
            .keys(&org_sessions_pattern(org_id))
            .await
            .map_err(SessionError::cache(format!(
                "listing sessions for org {}",
                org_id
            )))?;
        if keys.is_empty() {
            return Ok(0);
        }

        self.store
            .del(&keys)
            .await
            .map_err(SessionError::cache(format!(
                "deleting sessions for org {}",
                org_id
            )))
    }

    async fn check_session_field(
        &self,
        org_id: i64,
        user_id: i64,
        field: &str,
        presented: &str,
    ) -> SessionResult<()> {
        let key = session_key(org_id, user_id);
        let exists = self
            .store
            .exists(&key)
            .await
            .map_err(SessionError::cache(format!(
                "checking session for org {} user {}",
                org_id, user_id
            )))?;
        if !exists {
            return Err(SessionError::InvalidSession);
        }

        let stored = self
            .store
            .hget(&key, field)
            .await
            .map_err(SessionError::cache(format!(
                "reading session for org {} user {}",
                org_id, user_id
            )))?;
        match stored {
            Some(stored) if tokens_match(&stored, presented) => Ok(()),
            _ => Err(SessionError::InvalidSession),
        }
    }
}

/// 公共参数校验, 顺序固定: org, user, 令牌
fn validate_params(
    user_id: i64,
    org_id: i64,
    bearer_token: &str,
    api_token: &str,
) -> SessionResult<()> {
    if org_id == 0 {
        return Err(SessionError::MissingOrgId);
    }
    if user_id == 0 {
        return Err(SessionError::MissingUserId);
    }
    if bearer_token.is_empty() && api_token.is_empty() {
        return Err(SessionError::MissingCredential);
    }
    Ok(())
}

fn tokens_match(stored: &str, presented: &str) -> bool {
    !stored.is_empty() && bool::from(stored.as_bytes().ct_eq(presented.as_bytes()))
}
