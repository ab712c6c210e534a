use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use session_authority::{
    RedisSessionStore, SessionAuthority, SessionError, config::Config,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sessionctl")]
#[command(about = "Inspect and revoke tenant sessions in the shared cache")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or overwrite a session
    Create {
        #[arg(long)]
        org: i64,

        #[arg(long)]
        user: i64,

        /// Bearer token to bind to the session
        #[arg(long, default_value = "")]
        jwt: String,

        /// API token to bind and index
        #[arg(long, default_value = "")]
        api_token: String,

        /// Session lifetime in seconds (defaults to SESSION_TTL)
        #[arg(long)]
        ttl_secs: Option<u64>,
    },

    /// Check a bearer token against the live session
    CheckJwt {
        #[arg(long)]
        org: i64,

        #[arg(long)]
        user: i64,

        #[arg(long)]
        token: String,
    },

    /// Resolve an API token to its identity
    CheckApiToken { token: String },

    /// Delete one session
    Revoke {
        #[arg(long)]
        org: i64,

        #[arg(long)]
        user: i64,
    },

    /// Delete every session of an org
    RevokeOrg {
        #[arg(long)]
        org: i64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // 加载配置
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let store = match RedisSessionStore::open(&config.redis_url) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to create Redis client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let authority = SessionAuthority::with_api_token_ttl(store, config.api_token_ttl());

    match run(&authority, &config, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    authority: &SessionAuthority<RedisSessionStore>,
    config: &Config,
    command: Commands,
) -> Result<(), SessionError> {
    match command {
        Commands::Create {
            org,
            user,
            jwt,
            api_token,
            ttl_secs,
        } => {
            let ttl = ttl_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.session_ttl());
            authority
                .create_session(user, org, &jwt, &api_token, ttl)
                .await?;
            info!(org, user, ttl_secs = ttl.as_secs(), "session created");
        }
        Commands::CheckJwt { org, user, token } => {
            authority.validate_jwt_session(user, org, &token).await?;
            info!(org, user, "bearer token is valid");
        }
        Commands::CheckApiToken { token } => {
            let (user, org) = authority.validate_api_token_session(&token).await?;
            info!(org, user, "api token is valid");
        }
        Commands::Revoke { org, user } => {
            authority.delete_session(user, org).await?;
            info!(org, user, "session revoked");
        }
        Commands::RevokeOrg { org } => {
            let removed = authority.delete_all_org_sessions(org).await?;
            info!(org, removed, "org sessions revoked");
        }
    }
    Ok(())
}
