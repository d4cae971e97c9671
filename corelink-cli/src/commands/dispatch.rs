//! Dispatch command handlers
//!
//! Submitting jobs, waiting for their results, and following live output.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::*;
use corelink_client::{DispatchClient, JobHandle};
use corelink_core::domain::job::{JobPhase, JobState};
use corelink_core::domain::result::{ExitStatus, ResultValue};
use corelink_core::dto::job::DispatchRequest;

/// Arguments of the dispatch command
#[derive(Args)]
pub struct DispatchArgs {
    /// Command name, e.g. `core.system`
    pub command: String,

    /// Command arguments as a JSON object
    #[arg(default_value = "{}")]
    pub arguments: String,

    /// Serialize with other jobs on this queue
    #[arg(long)]
    pub queue: Option<String>,

    /// Seconds before the agent kills the job
    #[arg(long)]
    pub max_time: Option<u64>,

    /// Tag to attach (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Explicit job ID
    #[arg(long)]
    pub id: Option<String>,

    /// Restart the job this many seconds after it exits
    #[arg(long)]
    pub recurring: Option<u64>,

    /// Wait for the result and print it
    #[arg(short, long)]
    pub wait: bool,

    /// Capture live output and follow it
    #[arg(short, long)]
    pub stream: bool,
}

impl DispatchArgs {
    /// Builds the request, parsing the JSON arguments
    fn into_request(self) -> Result<DispatchRequest> {
        let arguments: serde_json::Value = serde_json::from_str(&self.arguments)
            .with_context(|| format!("Arguments are not valid JSON: {}", self.arguments))?;

        let mut request = DispatchRequest::new(self.command, arguments).stream(self.stream);
        if let Some(queue) = self.queue {
            request = request.queue(queue);
        }
        if let Some(seconds) = self.max_time {
            request = request.max_time(seconds);
        }
        if !self.tags.is_empty() {
            request = request.tags(self.tags);
        }
        if let Some(id) = self.id {
            request = request.id(id);
        }
        if let Some(seconds) = self.recurring {
            request = request.recurring_period(seconds);
        }
        Ok(request)
    }
}

/// Dispatch a job, optionally following it
pub async fn dispatch(client: &DispatchClient, args: DispatchArgs) -> Result<()> {
    let (wait, stream) = (args.wait, args.stream);
    let request = args.into_request()?;

    let job = client.dispatch(request).await?;
    println!("{} {}", "Dispatched".green(), job.id().cyan());

    if stream {
        follow(&job).await?;
    }
    if wait || stream {
        let result = job.get(None).await?;
        print_result(&result);
        ensure_success(&result)?;
    }

    Ok(())
}

/// Wait for a job and print its result
pub async fn get(client: &DispatchClient, id: &str, wait: Option<u64>, json: bool) -> Result<()> {
    let job = client.response_for(id);
    let timeout = wait.map(Duration::from_secs);

    if json {
        let value: serde_json::Value = job.get_json(timeout).await?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let result = job.get(timeout).await?;
    print_result(&result);
    ensure_success(&result)
}

/// Follow a job's live output
pub async fn stream(client: &DispatchClient, id: &str) -> Result<()> {
    follow(&client.response_for(id)).await
}

/// Print a job's lifecycle phase
pub async fn status(client: &DispatchClient, id: &str) -> Result<()> {
    let phase = client.response_for(id).state().await?;
    println!("  ID:     {}", id.cyan());
    println!("  Status: {}", colorize_phase(&phase));
    Ok(())
}

async fn follow(job: &JobHandle) -> Result<()> {
    let count = job.stream().await?;
    tracing::debug!("{} delivered {} stream message(s)", job.id(), count);
    Ok(())
}

fn ensure_success(result: &ResultValue) -> Result<()> {
    if !result.is_success() {
        bail!("Job {} finished with {}", result.id(), result.state());
    }
    Ok(())
}

/// Print detailed result information
fn print_result(result: &ResultValue) {
    println!("{}", "Result:".bold());
    println!("  ID:        {}", result.id().cyan());
    println!("  State:     {}", colorize_state(result.state()));
    match result.exit() {
        ExitStatus::Process(code) => println!("  Exit Code: {}", code),
        ExitStatus::Status(code) => println!("  Code:      {}", code),
    }
    if let Some(started) = result.started_at() {
        println!("  Started:   {}", started.format("%Y-%m-%d %H:%M:%S"));
    }
    println!("  Duration:  {}ms", result.elapsed().as_millis());

    if !result.stdout().is_empty() {
        println!("\n{}", "Stdout:".bold());
        print!("{}", result.stdout());
    }
    if !result.stderr().is_empty() {
        println!("\n{}", "Stderr:".bold());
        print!("{}", result.stderr().red());
    }
    if !result.data().is_empty() {
        println!("\n{}", "Data:".bold());
        match result.payload().decode::<serde_json::Value>() {
            Ok(value) => match serde_json::to_string_pretty(&value) {
                Ok(pretty) => println!("{}", pretty),
                Err(_) => println!("{}", result.data()),
            },
            Err(_) => println!("{}", result.data()),
        }
    }
}

/// Colorize job state for display
fn colorize_state(state: &JobState) -> ColoredString {
    let state_str = state.to_string();
    match state {
        JobState::Success => state_str.green(),
        JobState::Error | JobState::Timeout | JobState::Killed => state_str.red(),
        JobState::UnknownCmd | JobState::DuplicateId => state_str.yellow(),
        JobState::Other(_) => state_str.dimmed(),
    }
}

/// Colorize job phase for display
fn colorize_phase(phase: &JobPhase) -> ColoredString {
    let phase_str = phase.to_string();
    match phase {
        JobPhase::Unknown => phase_str.dimmed(),
        JobPhase::Running => phase_str.cyan(),
        JobPhase::Finished { .. } => phase_str.green(),
    }
}
