//! Budgetbase API server
//!
//! Serves account signup, signin and token-protected endpoints over HTTP,
//! backed by a SQL credential store.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use budgetbase_api::{ApiServer, ApiServerConfig};
use budgetbase_auth::{AuthService, HashConfig, PasswordHasher, TokenSigner};
use budgetbase_db::SqlCredentialStore;

/// Budgetbase API server
#[derive(Parser, Debug)]
#[command(name = "budgetbase")]
#[command(about = "Run the Budgetbase authentication API", long_about = None)]
#[command(version)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "5000")]
    port: u16,

    /// Secret used to sign session tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// Database URL (postgres://... or sqlite://...)
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://./budgetbase.db?mode=rwc")]
    database_url: String,

    /// Session token lifetime in hours (tokens never expire when unset)
    #[arg(long, env = "TOKEN_TTL_HOURS")]
    token_ttl_hours: Option<u32>,

    /// Argon2 memory cost in KiB
    #[arg(long, env = "HASH_MEMORY_KIB", default_value_t = HashConfig::default().memory_kib)]
    hash_memory_kib: u32,

    /// Argon2 iteration count
    #[arg(long, env = "HASH_ITERATIONS", default_value_t = HashConfig::default().iterations)]
    hash_iterations: u32,

    /// Argon2 parallelism
    #[arg(long, env = "HASH_PARALLELISM", default_value_t = HashConfig::default().parallelism)]
    hash_parallelism: u32,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Disable permissive CORS headers
    #[arg(long)]
    no_cors: bool,
}

fn init_logging(log_level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    if cli.jwt_secret.trim().is_empty() {
        anyhow::bail!("JWT secret must not be empty (set --jwt-secret or JWT_SECRET)");
    }

    info!("Starting Budgetbase API v{}", env!("CARGO_PKG_VERSION"));

    let db = budgetbase_db::connect(&cli.database_url)
        .await
        .context("Failed to connect to database")?;
    budgetbase_db::migrate(&db)
        .await
        .context("Failed to run database migrations")?;

    let hasher = PasswordHasher::new(HashConfig {
        memory_kib: cli.hash_memory_kib,
        iterations: cli.hash_iterations,
        parallelism: cli.hash_parallelism,
    })
    .context("Invalid password hashing parameters")?;

    let mut tokens = TokenSigner::new(cli.jwt_secret.as_bytes());
    if let Some(hours) = cli.token_ttl_hours {
        info!("Session tokens expire after {} hours", hours);
        tokens = tokens.with_ttl(chrono::Duration::hours(i64::from(hours)));
    }

    let auth = AuthService::new(Arc::new(SqlCredentialStore::new(db)), hasher, tokens)
        .context("Failed to initialise auth service")?;

    let config = ApiServerConfig {
        bind_addr: SocketAddr::from(([0, 0, 0, 0], cli.port)),
        enable_cors: !cli.no_cors,
    };

    ApiServer::new(config, Arc::new(auth)).start().await
}
