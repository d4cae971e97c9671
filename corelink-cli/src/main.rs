//! Corelink CLI
//!
//! Command-line interface for dispatching jobs to a remote agent and
//! inspecting their results.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "corelink")]
#[command(about = "Dispatch jobs to a remote agent over Redis", long_about = None)]
struct Cli {
    /// Broker host
    #[arg(long, global = true, env = "CORELINK_HOST", default_value = "localhost")]
    host: String,

    /// Broker port
    #[arg(long, global = true, env = "CORELINK_PORT", default_value_t = 6379)]
    port: u16,

    /// Broker password
    #[arg(long, global = true, env = "CORELINK_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Broker database index
    #[arg(long, global = true, env = "CORELINK_DB", default_value_t = 0)]
    db: i64,

    /// Default result timeout in seconds
    #[arg(long, global = true, env = "CORELINK_TIMEOUT", default_value_t = 10)]
    timeout: u64,

    /// Pings sent before giving up on the agent (0 skips the check)
    #[arg(long, global = true, env = "CORELINK_CONNECT_ATTEMPTS", default_value_t = 3)]
    connect_attempts: u32,

    /// Use TLS (server certificates are not verified)
    #[arg(
        long,
        global = true,
        env = "CORELINK_SSL",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    ssl: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so job output on stdout stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corelink_cli=info,corelink_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        host: cli.host,
        port: cli.port,
        password: cli.password,
        db: cli.db,
        timeout: cli.timeout,
        connect_attempts: cli.connect_attempts,
        ssl: cli.ssl,
    };

    handle_command(cli.command, &config).await
}
