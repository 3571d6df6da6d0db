//! HTTP server command
//!
//! Resolves configuration from flags and the environment, then runs the
//! server until shutdown.

use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use clap::Args;
use quire_server::config::{resolve_secret, Environment, ServerConfig};
use quire_server::run_server;

use super::db::DatabaseArgs;

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Session signing key, at least 32 bytes in production
    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Address to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, short = 'p', env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Session lifetime in hours
    #[arg(long, env = "SESSION_TTL_HOURS", default_value_t = 24)]
    pub session_ttl_hours: i64,
}

impl ServeArgs {
    /// Build the server configuration. Fails before any connection is made.
    pub fn into_config(self, environment: Environment) -> Result<ServerConfig> {
        let secret_key = resolve_secret(environment, self.secret_key)?;
        anyhow::ensure!(self.session_ttl_hours > 0, "SESSION_TTL_HOURS must be positive");

        Ok(ServerConfig {
            bind_addr: SocketAddr::new(self.host, self.port),
            database_url: self.database.resolve(environment)?,
            environment,
            secret_key,
            session_ttl: chrono::Duration::hours(self.session_ttl_hours),
        })
    }
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs, environment: Environment) -> Result<()> {
    let config = args.into_config(environment)?;
    tracing::info!(%environment, "Starting quire server on {}", config.bind_addr);

    // Run server (blocks until shutdown)
    run_server(config).await.context("Server error")?;

    Ok(())
}
