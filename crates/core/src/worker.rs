// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker records and status transitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::job::JobInfo;

/// Lifecycle status of a worker.
///
/// `Removing` is `Busy` plus a pending removal: the worker still runs its
/// job but vanishes from the pool once the job finishes. `Removed` only
/// exists on records already detached from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Idle,
    Busy,
    Removing,
    Removed,
}

impl WorkerStatus {
    /// Whether a job is currently attached to the worker.
    pub fn is_occupied(self) -> bool {
        matches!(self, WorkerStatus::Busy | WorkerStatus::Removing)
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerStatus::Idle => "idle",
            WorkerStatus::Busy => "busy",
            WorkerStatus::Removing => "removing",
            WorkerStatus::Removed => "removed",
        };
        write!(f, "{}", s)
    }
}

/// A registered remote execution host.
///
/// Persisted fields only — the supervisor task handle and its cancellation
/// token live in the daemon and are rebuilt on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub ip: String,
    #[serde(default)]
    pub envs: BTreeMap<String, String>,
    pub status: WorkerStatus,
    #[serde(default)]
    pub running_job: Option<JobInfo>,
    // Absent in snapshots written before removal tracking existed.
    #[serde(default)]
    pub remove_after_finish: bool,
}

impl Worker {
    pub fn new(ip: impl Into<String>, envs: BTreeMap<String, String>) -> Self {
        Self {
            ip: ip.into(),
            envs,
            status: WorkerStatus::Idle,
            running_job: None,
            remove_after_finish: false,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.status == WorkerStatus::Idle
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
