// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The control-channel server.
//!
//! Commands arrive on a named pipe: each CLI client opens it, writes one
//! newline-terminated JSON record, and closes. The loop blocks on the open,
//! dispatches each record in order, and writes one JSON response to the
//! per-request reply FIFO named in the record. Dispatch is single-threaded;
//! only supervisor completions mutate the store concurrently.

use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::unix::pipe;
use tracing::{error, info, warn};

use jh_core::Clock;

use crate::env;
use crate::protocol::{Command, CommandRecord, Response};
use crate::state::Store;

/// Name of the command FIFO inside the data directory.
pub const COMMANDS_FIFO: &str = "commands_fifo";

const KNOWN_TYPES: [&str; 7] = [
    "shutdown",
    "add_job",
    "remove_job",
    "add_slave",
    "remove_slave",
    "status",
    "load_status",
];

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to create {}: {source}", .path.display())]
    CreateFifo { path: PathBuf, source: nix::Error },

    #[error("failed to read {}: {source}", .path.display())]
    ReadFifo { path: PathBuf, source: std::io::Error },
}

/// The command-loop server. Runs until a `shutdown` command lands.
pub struct Listener<C: Clock + 'static> {
    store: Store<C>,
    fifo_path: PathBuf,
}

impl<C: Clock + 'static> Listener<C> {
    pub fn new(store: Store<C>, data_dir: &Path) -> Self {
        Self { store, fifo_path: data_dir.join(COMMANDS_FIFO) }
    }

    /// Serve commands until shutdown.
    pub async fn run(self) -> Result<(), ListenerError> {
        loop {
            ensure_fifo(&self.fifo_path)?;
            let records = match read_records(&self.fifo_path).await {
                Ok(records) => records,
                Err(e) => {
                    // Transient: the FIFO may have been removed under us;
                    // the next iteration recreates it.
                    error!(error = %e, "error reading the command stream");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            };
            for line in records.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                self.dispatch(line).await;
                if self.store.should_stop() {
                    info!("command loop stopped");
                    return Ok(());
                }
            }
        }
    }

    /// Handle one record: parse, execute, reply. Never fails the loop —
    /// anything that goes wrong is reported to the client as `{err}` or,
    /// lacking a reply pipe, logged.
    async fn dispatch(&self, line: &str) {
        let value: serde_json::Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "error parsing json from command stream");
                return;
            }
        };
        let pipe = value.get("pipe").and_then(|p| p.as_str()).map(PathBuf::from);

        let response = match serde_json::from_value::<CommandRecord>(value.clone()) {
            Ok(record) => self.handle(record.command).await,
            Err(e) => match value.get("type").and_then(|t| t.as_str()) {
                Some(kind) if !KNOWN_TYPES.contains(&kind) => {
                    Response::err(format!("Unknown command type {}", kind))
                }
                _ => Response::err(e),
            },
        };

        if let Some(pipe) = pipe {
            write_reply(&pipe, &response).await;
        }
    }

    async fn handle(&self, command: Command) -> Response {
        match command {
            Command::Shutdown => {
                info!("shutting down");
                self.store.shutdown().await;
                Response::msg("Stopped")
            }

            Command::AddJob { args, envs } => {
                self.store.add_job(args, &envs).map_or_else(Response::err, Response::msg)
            }

            Command::RemoveJob { args, envs } => {
                self.store.remove_job(args, &envs).map_or_else(Response::err, Response::msg)
            }

            Command::AddSlave { ip, envs } => {
                self.store.add_slave(&ip, &envs).map_or_else(Response::err, Response::msg)
            }

            Command::RemoveSlave { ip, options } => self
                .store
                .remove_slave(&ip, options)
                .await
                .map_or_else(Response::err, Response::msg),

            Command::Status => Response::Status(self.store.status()),

            Command::LoadStatus { file } => {
                self.store.load_status(&file).map_or_else(Response::err, Response::msg)
            }
        }
    }
}

fn ensure_fifo(path: &Path) -> Result<(), ListenerError> {
    if path.exists() {
        return Ok(());
    }
    mkfifo(path, Mode::from_bits_truncate(0o644)).map_err(|source| {
        ListenerError::CreateFifo { path: path.to_path_buf(), source }
    })
}

/// Block until a client opens, writes, and closes the FIFO; return what it
/// wrote. Runs on the blocking pool since FIFO opens have no async form.
async fn read_records(path: &Path) -> Result<String, ListenerError> {
    let path_buf = path.to_path_buf();
    let read = tokio::task::spawn_blocking(move || std::fs::read_to_string(&path_buf))
        .await
        .map_err(std::io::Error::other)
        .and_then(|r| r);
    read.map_err(|source| ListenerError::ReadFifo { path: path.to_path_buf(), source })
}

/// Write one response line to a reply FIFO.
///
/// Opening a FIFO for writing fails with ENXIO until the client opens the
/// read end, so retry briefly; a client that never shows up is logged and
/// forgotten.
async fn write_reply(path: &Path, response: &Response) {
    let line = match serde_json::to_string(response) {
        Ok(line) => line,
        Err(e) => {
            error!(error = %e, "failed to encode response");
            return;
        }
    };

    let deadline = tokio::time::Instant::now() + env::reply_timeout();
    let mut sender = loop {
        match pipe::OpenOptions::new().open_sender(path) {
            Ok(sender) => break sender,
            Err(e) if e.raw_os_error() == Some(nix::errno::Errno::ENXIO as i32) => {
                if tokio::time::Instant::now() >= deadline {
                    warn!(pipe = %path.display(), "client never opened its reply pipe");
                    return;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            Err(e) => {
                warn!(pipe = %path.display(), error = %e, "cannot open reply pipe");
                return;
            }
        }
    };

    if let Err(e) = sender.write_all(format!("{}\n", line).as_bytes()).await {
        warn!(pipe = %path.display(), error = %e, "failed to write reply");
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
