// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `jobherd` — scheduler service command line interface.
//!
//! Every subcommand except `start` is a one-shot client of a running
//! daemon; `start` hosts the daemon loop in the foreground.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod ssh;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "jobherd", version, about = "Scheduler service command line interface")]
struct Cli {
    /// Directory the daemon keeps its FIFO, pid file, and snapshot in
    #[arg(long = "server_data_dir", default_value = ".data", global = true)]
    server_data_dir: PathBuf,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
#[command(rename_all = "snake_case")]
enum CliCommand {
    /// Start the scheduler service in the foreground
    Start {
        /// Directory job output is written to
        #[arg(long = "log_dir", default_value = "logs")]
        log_dir: PathBuf,
    },

    /// Stop the running service
    Stop,

    /// Show the job waitlist and every worker
    Status,

    /// Submit a job
    AddJob(JobArgs),

    /// Remove an exactly-matching job from the waitlist
    RemoveJob(JobArgs),

    /// Register worker hosts
    AddSlave {
        /// IP addresses of the workers (passwordless SSH expected)
        #[arg(required = true)]
        ip: Vec<String>,
        /// Default K=V environment entries for every job on these workers
        #[arg(long = "env")]
        env: Vec<String>,
        /// Skip the passwordless-SSH reachability probe
        #[arg(long = "skip_ssh_auth_check")]
        skip_ssh_auth_check: bool,
    },

    /// Deregister worker hosts
    RemoveSlave {
        #[arg(required = true)]
        ip: Vec<String>,
        /// Remove once the running job finishes
        #[arg(long)]
        wait: bool,
        /// Kill the running job and remove now
        #[arg(long, conflicts_with = "wait")]
        kill: bool,
    },

    /// Replace daemon state from a status JSON file
    LoadStatus { file: PathBuf },
}

#[derive(Debug, Args)]
struct JobArgs {
    /// Job script, run as ./script on the assigned worker
    script: String,

    /// Arguments passed to the script (put dash-leading ones after `--`)
    args: Vec<String>,

    /// K=V environment overrides for this job
    #[arg(long = "env")]
    env: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let data_dir = cli.server_data_dir;
    match cli.command {
        CliCommand::Start { log_dir } => commands::daemon::start(data_dir, log_dir).await,
        CliCommand::Stop => commands::daemon::stop(&data_dir).await,
        CliCommand::Status => commands::daemon::status(&data_dir).await,
        CliCommand::AddJob(args) => commands::job::add(&data_dir, args).await,
        CliCommand::RemoveJob(args) => commands::job::remove(&data_dir, args).await,
        CliCommand::AddSlave { ip, env, skip_ssh_auth_check } => {
            commands::slave::add(&data_dir, ip, env, skip_ssh_auth_check).await
        }
        CliCommand::RemoveSlave { ip, wait, kill } => {
            commands::slave::remove(&data_dir, ip, wait, kill).await
        }
        CliCommand::LoadStatus { file } => commands::daemon::load_status(&data_dir, file).await,
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
