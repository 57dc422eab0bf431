// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment rules: `K=V` parsing, reserved names, and the per-job merge.

use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

/// Injected into every job: the id minted at launch.
pub const ENV_JOB_ID: &str = "JOB_ID";
/// Injected into every job: the address of the worker running it.
pub const ENV_SLAVE_IP: &str = "SLAVE_IP";

const RESERVED: [&str; 2] = [ENV_JOB_ID, ENV_SLAVE_IP];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    #[error("Environment name {0} is reserved.")]
    Reserved(String),

    #[error("Invalid environment entry {0:?}: expected KEY=VALUE")]
    Malformed(String),
}

/// Parse `K=V` pairs into a map, rejecting reserved and malformed entries.
///
/// A key given twice is warned about and the last value wins. The value may
/// itself contain `=`; only the first one splits.
pub fn parse_env_pairs(pairs: &[String]) -> Result<BTreeMap<String, String>, EnvError> {
    let mut envs = BTreeMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| EnvError::Malformed(pair.clone()))?;
        if key.is_empty() {
            return Err(EnvError::Malformed(pair.clone()));
        }
        if RESERVED.contains(&key) {
            return Err(EnvError::Reserved(key.to_string()));
        }
        if envs.insert(key.to_string(), value.to_string()).is_some() {
            warn!(key, "duplicate environment key, last value wins");
        }
    }
    Ok(envs)
}

/// Assemble the environment injected into a spawned job.
///
/// Precedence, last wins: reserved pair, worker defaults, job overrides.
/// Reserved keys cannot be present in the other two maps — `parse_env_pairs`
/// rejects them at the boundary.
pub fn merge_job_env(
    job_id: &str,
    worker_ip: &str,
    worker_envs: &BTreeMap<String, String>,
    job_envs: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = BTreeMap::new();
    merged.insert(ENV_JOB_ID.to_string(), job_id.to_string());
    merged.insert(ENV_SLAVE_IP.to_string(), worker_ip.to_string());
    for (k, v) in worker_envs {
        merged.insert(k.clone(), v.clone());
    }
    for (k, v) in job_envs {
        merged.insert(k.clone(), v.clone());
    }
    merged
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
