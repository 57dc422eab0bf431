// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::time::Duration;

/// Supervisor poll interval (default 1 s, configurable via `JOBHERD_POLL_MS`).
pub fn poll_interval() -> Duration {
    std::env::var("JOBHERD_POLL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(1))
}

/// How long the server keeps trying to open a reply FIFO for writing before
/// giving the client up for dead (default 5 s, `JOBHERD_REPLY_TIMEOUT_MS`).
pub fn reply_timeout() -> Duration {
    std::env::var("JOBHERD_REPLY_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Grace period between SIGTERM and SIGKILL on `remove_slave --kill`
/// (default 5 s, `JOBHERD_KILL_GRACE_MS`).
pub fn kill_grace() -> Duration {
    std::env::var("JOBHERD_KILL_GRACE_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}
