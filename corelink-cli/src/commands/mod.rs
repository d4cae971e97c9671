//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod dispatch;
mod job;

pub use dispatch::DispatchArgs;
pub use job::JobCommands;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use corelink_client::DispatchClient;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Check that the agent answers
    Ping,
    /// Dispatch a command to the agent
    Dispatch(DispatchArgs),
    /// Wait for a job and print its result
    Get {
        /// Job ID
        id: String,

        /// Seconds to wait (defaults to --timeout)
        #[arg(short, long)]
        wait: Option<u64>,

        /// Print the JSON result data only
        #[arg(long)]
        json: bool,
    },
    /// Follow a job's live output until it ends
    Stream {
        /// Job ID
        id: String,
    },
    /// Show whether a job is running, finished or unknown
    Status {
        /// Job ID
        id: String,
    },
    /// Job management
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
}

/// Handle a CLI command
///
/// Connects to the broker and routes the command to its handler.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    let client_config = config.client_config()?;

    // Ping does its own reporting, so skip the connect-time check
    let connect_config = if matches!(command, Commands::Ping) {
        client_config.clone().without_connect_check()
    } else {
        client_config.clone()
    };
    let client = DispatchClient::connect(&connect_config)
        .await
        .with_context(|| format!("Failed to connect to {}", client_config.address()))?;

    match command {
        Commands::Ping => ping(&client).await,
        Commands::Dispatch(args) => dispatch::dispatch(&client, args).await,
        Commands::Get { id, wait, json } => dispatch::get(&client, &id, wait, json).await,
        Commands::Stream { id } => dispatch::stream(&client, &id).await,
        Commands::Status { id } => dispatch::status(&client, &id).await,
        Commands::Job { command } => job::handle_job_command(command, &client).await,
    }
}

/// Ping the agent once and report the answer
async fn ping(client: &DispatchClient) -> Result<()> {
    let reply = client.ping().await.context("Agent did not answer")?;
    println!("{} {}", "✓".green(), reply);
    Ok(())
}
