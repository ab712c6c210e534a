pub mod cache;
pub mod config;
pub mod error;
pub mod session;

pub use cache::{MemorySessionStore, RedisSessionStore, SessionStore};
pub use error::{SessionError, SessionResult};
pub use session::{DEFAULT_API_TOKEN_TTL, SessionAuthority};
