// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

use jh_core::{JobRequest, Worker};

/// The `status` payload, and the document `load_status` consumes.
///
/// `job_waitlist` entries are `[argv, env_overrides]` pairs; `slaves`
/// entries carry the worker's persisted fields. Feeding a `status` reply
/// back through `load_status` reproduces the observable state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusView {
    pub job_waitlist: Vec<JobRequest>,
    pub slaves: Vec<Worker>,
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
