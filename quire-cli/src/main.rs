//! quire CLI
//!
//! - `serve`: run the web application
//! - `init-db`: create the schema
//! - `check-db`: verify the database is reachable

use anyhow::Result;
use clap::{Parser, Subcommand};
use quire_server::Environment;

mod commands;
mod tracing_setup;

use commands::{DatabaseArgs, ServeArgs};
use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "quire",
    author,
    version,
    about = "Posts and accounts web application with request-scoped database access"
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Deployment environment (development or production)
    #[arg(long = "env", env = "QUIRE_ENV", global = true, default_value = "production")]
    environment: Environment,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Create database tables if they do not exist
    InitDb(DatabaseArgs),
    /// Connect to the database and run a trivial query
    CheckDb(DatabaseArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    tracing_setup::init(&TracingConfig { debug: cli.debug }).ok();

    match cli.command {
        Commands::Serve(args) => commands::run_serve(args, cli.environment).await?,
        Commands::InitDb(args) => commands::run_init_db(args, cli.environment).await?,
        Commands::CheckDb(args) => commands::run_check_db(args, cli.environment).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn env_flag_parses() {
        let cli = Cli::try_parse_from(["quire", "--env", "development", "check-db"]).unwrap();
        assert_eq!(cli.environment, Environment::Development);
        assert!(matches!(cli.command, Commands::CheckDb(_)));
    }
}
