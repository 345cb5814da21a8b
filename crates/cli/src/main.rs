//! Mesos Metrics Agent CLI
//!
//! A command-line tool for inspecting a mesos agent directly: listing live
//! containers, dumping task and framework state, and previewing the naming
//! metadata the metrics agent would tag each container with.

mod commands;
mod output;

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use agent_lib::client::{ClientConfig, MesosClient};
use commands::{containers, resolve, state};

/// Mesos Metrics Agent CLI
#[derive(Parser)]
#[command(name = "mma")]
#[command(author, version, about = "CLI for the Mesos Metrics Agent", long_about = None)]
pub struct Cli {
    /// Mesos agent URL (can also be set via MESOS_AGENT_URL env var)
    #[arg(long, env = "MESOS_AGENT_URL", default_value = "http://localhost:5051")]
    pub agent_url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List live containers and their resource statistics
    Containers,

    /// Show the agent's frameworks and tasks
    State {
        /// Skip the frameworks table
        #[arg(long)]
        tasks_only: bool,
    },

    /// Match live containers against agent state and show the metadata
    /// each container would be tagged with
    Resolve {
        /// Show only containers that matched no task
        #[arg(long)]
        unmatched_only: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let client = MesosClient::new(ClientConfig {
        agent_url: cli.agent_url.clone(),
        fetch_timeout: Duration::from_secs(cli.timeout_secs),
    })?;

    match cli.command {
        Commands::Containers => {
            containers::list_containers(&client, cli.format).await?;
        }
        Commands::State { tasks_only } => {
            state::show_state(&client, tasks_only, cli.format).await?;
        }
        Commands::Resolve { unmatched_only } => {
            resolve::resolve_containers(&client, unmatched_only, cli.format).await?;
        }
    }

    Ok(())
}
