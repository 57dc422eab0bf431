// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and shutdown.
//!
//! One daemon per data directory: `service_pid` names the live instance
//! and a second `start` refuses while that pid exists. Startup reclaims
//! whatever a crashed predecessor left behind — a stale FIFO, orphaned
//! reply pipes — then loads the snapshot, re-monitors running jobs, and
//! serves the command loop until `shutdown`.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use jh_core::SystemClock;

use crate::listener::{Listener, ListenerError, COMMANDS_FIFO};
use crate::state::{Store, StorePaths};
use crate::storage::SnapshotError;
use crate::supervisor::pid_alive;

/// Name of the pid file inside the data directory.
pub const SERVICE_PID: &str = "service_pid";
/// Name of the durable snapshot inside the data directory.
pub const SNAPSHOT_FILE: &str = "server_context.pkl";
/// Prefix of per-request reply FIFOs inside the data directory.
pub const REPLY_PREFIX: &str = "tmp_";

/// Daemon configuration, resolved by the CLI.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for the FIFO, pid file, snapshot, and reply pipes.
    pub data_dir: PathBuf,
    /// Directory job logs are written to.
    pub log_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("a server is already running (pid {0}); stop it with `jobherd stop`")]
    AlreadyRunning(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Run the daemon until it is told to stop.
pub async fn run(config: Config) -> Result<(), LifecycleError> {
    std::fs::create_dir_all(&config.data_dir)?;
    let pid_path = config.data_dir.join(SERVICE_PID);
    let fifo_path = config.data_dir.join(COMMANDS_FIFO);

    if let Some(pid) = read_live_pid(&pid_path) {
        return Err(LifecycleError::AlreadyRunning(pid));
    }
    if fifo_path.exists() {
        // Left over from a crashed instance; recreate below so no stale
        // writer state survives.
        std::fs::remove_file(&fifo_path)?;
    }
    collect_stale_replies(&config.data_dir);
    std::fs::write(&pid_path, std::process::id().to_string())?;

    let store = Store::open(
        StorePaths {
            snapshot: config.data_dir.join(SNAPSHOT_FILE),
            log_dir: config.log_dir.clone(),
        },
        SystemClock,
    )?;
    info!("handling existing tasks");
    store.schedule_pending();
    info!("server started");

    let result = Listener::new(store, &config.data_dir).run().await;

    let _ = std::fs::remove_file(&fifo_path);
    let _ = std::fs::remove_file(&pid_path);
    result.map_err(Into::into)
}

/// The pid from `service_pid`, if that process is still alive.
fn read_live_pid(pid_path: &Path) -> Option<u32> {
    let pid = std::fs::read_to_string(pid_path).ok()?.trim().parse::<u32>().ok()?;
    pid_alive(pid).then_some(pid)
}

/// Remove reply FIFOs orphaned by clients that died mid-request.
fn collect_stale_replies(data_dir: &Path) {
    let Ok(entries) = std::fs::read_dir(data_dir) else {
        return;
    };
    let mut removed = 0usize;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(REPLY_PREFIX) {
            match std::fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %entry.path().display(), error = %e, "could not remove stale reply pipe"),
            }
        }
    }
    if removed > 0 {
        info!(removed, "collected stale reply pipes");
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
