use std::collections::HashMap;

use crate::error::{SessionError, SessionResult};

pub const FIELD_ORG: &str = "org";
pub const FIELD_USER: &str = "user";
pub const FIELD_JWT: &str = "jwt";
pub const FIELD_API_TOKEN: &str = "apiToken";

/// 会话缓存数据模型, 每个 (org, user) 至多一条
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub org: i64,
    pub user: i64,
    pub jwt: Option<String>,
    pub api_token: Option<String>,
}

impl SessionRecord {
    /// 空字符串视为未提供
    pub fn new(org: i64, user: i64, jwt: &str, api_token: &str) -> Self {
        Self {
            org,
            user,
            jwt: non_empty(jwt),
            api_token: non_empty(api_token),
        }
    }

    /// 写入哈希的字段, 省略未提供的令牌
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            (FIELD_ORG, self.org.to_string()),
            (FIELD_USER, self.user.to_string()),
        ];
        if let Some(jwt) = &self.jwt {
            fields.push((FIELD_JWT, jwt.clone()));
        }
        if let Some(api_token) = &self.api_token {
            fields.push((FIELD_API_TOKEN, api_token.clone()));
        }
        fields
    }
}

/// API 令牌索引, 指向所属会话
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiTokenIndexRecord {
    pub org: i64,
    pub user: i64,
}

impl ApiTokenIndexRecord {
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (FIELD_ORG, self.org.to_string()),
            (FIELD_USER, self.user.to_string()),
        ]
    }

    pub fn from_fields(fields: &HashMap<String, String>) -> SessionResult<Self> {
        Ok(Self {
            org: parse_id(fields, FIELD_ORG)?,
            user: parse_id(fields, FIELD_USER)?,
        })
    }
}

fn parse_id(fields: &HashMap<String, String>, field: &'static str) -> SessionResult<i64> {
    fields
        .get(field)
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or(SessionError::MalformedRecord {
            record: "api token index",
            field,
        })
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_fields_omit_absent_tokens() {
        let record = SessionRecord::new(7, 42, "tok-a", "");
        assert_eq!(
            record.fields(),
            vec![
                ("org", "7".to_string()),
                ("user", "42".to_string()),
                ("jwt", "tok-a".to_string()),
            ]
        );

        let record = SessionRecord::new(7, 42, "", "api-a");
        assert_eq!(record.jwt, None);
        assert_eq!(record.fields().last(), Some(&("apiToken", "api-a".to_string())));
    }

    #[test]
    fn test_index_from_fields() {
        let fields: HashMap<String, String> = [("org", "7"), ("user", "42")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let index = ApiTokenIndexRecord::from_fields(&fields).unwrap();
        assert_eq!(index, ApiTokenIndexRecord { org: 7, user: 42 });
    }

    #[test]
    fn test_index_from_malformed_fields() {
        let fields: HashMap<String, String> = [("org", "seven"), ("user", "42")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let err = ApiTokenIndexRecord::from_fields(&fields).unwrap_err();
        assert!(matches!(
            err,
            SessionError::MalformedRecord { field: "org", .. }
        ));

        let fields: HashMap<String, String> =
            [("org".to_string(), "7".to_string())].into_iter().collect();
        let err = ApiTokenIndexRecord::from_fields(&fields).unwrap_err();
        assert!(matches!(
            err,
            SessionError::MalformedRecord { field: "user", .. }
        ));
    }
}
