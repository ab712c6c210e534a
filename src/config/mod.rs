use std::env;
use std::time::Duration;

const DEFAULT_SESSION_TTL_HOURS: u64 = 24;
const DEFAULT_API_TOKEN_TTL_HOURS: u64 = 24;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub redis_url: String,
    pub session_ttl_secs: u64,
    pub api_token_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let session_ttl = parse_hours(env::var("SESSION_TTL").ok(), DEFAULT_SESSION_TTL_HOURS);
        let api_token_ttl =
            parse_hours(env::var("API_TOKEN_TTL").ok(), DEFAULT_API_TOKEN_TTL_HOURS);
        Ok(Config {
            redis_url: env::var("REDIS_URL")?,
            session_ttl_secs: session_ttl * 3600,
            api_token_ttl_secs: api_token_ttl * 3600,
        })
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn api_token_ttl(&self) -> Duration {
        Duration::from_secs(self.api_token_ttl_secs)
    }
}

/// 解析 `24` 或 `24h` 形式的小时数, 无法解析时使用默认值
fn parse_hours(raw: Option<String>, default: u64) -> u64 {
    raw.as_deref()
        .map(|v| v.trim().trim_end_matches('h'))
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}
