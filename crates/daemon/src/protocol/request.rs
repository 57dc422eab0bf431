// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Command from a CLI client to the daemon.
///
/// Env lists travel as raw `K=V` strings and are validated server-side so
/// every client sees the same rejection messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Drain in-flight handlers and stop the daemon
    Shutdown,

    /// Queue a job (argv plus `K=V` env overrides)
    AddJob {
        args: Vec<String>,
        #[serde(default)]
        envs: Vec<String>,
    },

    /// Remove the first structurally-equal job from the waitlist
    RemoveJob {
        args: Vec<String>,
        #[serde(default)]
        envs: Vec<String>,
    },

    /// Register a worker host
    AddSlave {
        ip: String,
        #[serde(default)]
        envs: Vec<String>,
    },

    /// Deregister a worker host
    RemoveSlave {
        ip: String,
        #[serde(default)]
        options: RemoveOptions,
    },

    /// Report the full waitlist + worker state
    Status,

    /// Replace in-memory state from a status JSON file
    LoadStatus { file: PathBuf },
}

/// How `remove_slave` treats a busy worker.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Remove the worker once its running job finishes
    #[serde(default)]
    pub wait: bool,
    /// Kill the running job and remove the worker now
    #[serde(default)]
    pub kill: bool,
}

/// One record on the command FIFO: the command plus the optional reply pipe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandRecord {
    #[serde(flatten)]
    pub command: Command,
    /// Path of the per-request reply FIFO; absent means fire-and-forget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipe: Option<PathBuf>,
}

impl CommandRecord {
    pub fn new(command: Command) -> Self {
        Self { command, pipe: None }
    }

    pub fn with_pipe(command: Command, pipe: PathBuf) -> Self {
        Self { command, pipe: Some(pipe) }
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
