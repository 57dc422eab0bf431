// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot persistence for crash recovery.
//!
//! The snapshot holds the complete durable state — the worker list and the
//! job waitlist — and is rewritten on every committed mutation. The file
//! keeps the legacy deployment path (`server_context.pkl`) but the content
//! is self-describing versioned JSON; the pickled tuples of the system this
//! replaces do not load and are reported as unsupported.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use thiserror::Error;

use jh_core::{JobRequest, Worker};

/// Current snapshot schema version
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

/// Errors that can occur in snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported snapshot version {0} (expected {CURRENT_SNAPSHOT_VERSION})")]
    UnsupportedVersion(u32),
}

/// The durable state at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Schema version for migrations
    #[serde(rename = "v")]
    pub version: u32,
    pub workers: Vec<Worker>,
    pub waitlist: VecDeque<JobRequest>,
}

impl Snapshot {
    pub fn new(workers: Vec<Worker>, waitlist: VecDeque<JobRequest>) -> Self {
        Self { version: CURRENT_SNAPSHOT_VERSION, workers, waitlist }
    }
}

/// Write a snapshot atomically: serialize to a sibling temp file, then
/// rename over the target so readers never observe a torn write.
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, serde_json::to_vec(snapshot)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Load the snapshot if one exists. A missing file is a fresh start, not an
/// error; a version ahead of this build refuses to load.
pub fn load(path: &Path) -> Result<Option<Snapshot>, SnapshotError> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path)?;
    let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
    if snapshot.version > CURRENT_SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(snapshot.version));
    }
    Ok(Some(snapshot))
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
