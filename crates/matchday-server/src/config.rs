use clap::Parser;
use std::path::PathBuf;

/// Server configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "matchday-server")]
#[command(author, version, about = "Sync daemon and REST API for the Matchday sports catalog")]
pub struct ServerConfig {
    /// PostgreSQL database connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Redis connection URL; when absent the server runs without the
    /// shared cache, distributed lock, and durable notification queue
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Server port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Server host to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Path to sources.toml configuration file
    #[arg(long, env = "SOURCES_CONFIG")]
    pub sources_config: Option<PathBuf>,

    /// Skip the sequential sync pass normally run at startup
    #[arg(long, env = "SKIP_INITIAL_SYNC", default_value = "false")]
    pub skip_initial_sync: bool,

    /// Allowed CORS origins, comma-separated, or "*" for any
    #[arg(long, env = "CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,
}
