//! Job command handlers
//!
//! Listing, signalling and unscheduling jobs on the agent.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use corelink_client::{DispatchClient, SIGTERM};
use serde_json::Value;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// List running jobs
    List {
        /// Only show this job
        id: Option<String>,
    },
    /// Send a signal to a running job
    Kill {
        /// Job ID
        id: String,

        /// Signal number
        #[arg(short, long, default_value_t = SIGTERM)]
        signal: i32,
    },
    /// Stop a recurring job from being restarted
    Unschedule {
        /// Job ID
        id: String,
    },
}

/// Handle job commands
pub async fn handle_job_command(command: JobCommands, client: &DispatchClient) -> Result<()> {
    match command {
        JobCommands::List { id } => list_jobs(client, id.as_deref()).await,
        JobCommands::Kill { id, signal } => {
            client.jobs().kill(&id, signal).await?;
            println!("{} signal {} to {}", "Sent".green(), signal, id.cyan());
            Ok(())
        }
        JobCommands::Unschedule { id } => {
            client.jobs().unschedule(&id).await?;
            println!("{} {}", "Unscheduled".green(), id.cyan());
            Ok(())
        }
    }
}

/// List jobs known to the agent
async fn list_jobs(client: &DispatchClient, id: Option<&str>) -> Result<()> {
    let jobs = client.jobs().list(id).await?;

    let entries: Vec<&Value> = match &jobs {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    };

    if entries.is_empty() {
        println!("{}", "No jobs found.".yellow());
        return Ok(());
    }

    println!("{}", format!("Found {} job(s):", entries.len()).bold());
    println!();
    for entry in entries {
        print_job_summary(entry);
    }

    Ok(())
}

/// Print one entry of the agent's job listing
fn print_job_summary(entry: &Value) {
    let field = |name: &str| entry.get(name).and_then(Value::as_str).unwrap_or("-");
    let command = entry.get("cmd").unwrap_or(entry);

    let id = command.get("id").and_then(Value::as_str).unwrap_or_else(|| field("id"));
    let name = command
        .get("command")
        .and_then(Value::as_str)
        .unwrap_or_else(|| field("command"));

    println!("  {} Job {}", "▸".cyan(), id.dimmed());
    println!("    Command: {}", name);
    if let Some(started) = entry.get("starttime").and_then(Value::as_i64) {
        println!("    Started: {}", started.to_string().dimmed());
    }
    println!();
}
