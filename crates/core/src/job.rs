// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job requests and running-job records.

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::clock::Clock;

/// Identifier of a launched job: the decimal epoch-millisecond timestamp
/// taken at spawn time. Kept as a string so ids survive the status JSON
/// round-trip byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    /// Mint an id from the clock's current epoch milliseconds.
    pub fn mint(clock: &impl Clock) -> Self {
        Self(clock.epoch_ms().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Borrow<str> for JobId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A queued job: the script invocation and its environment overrides.
///
/// `args[0]` is the script path, `./`-prefixed by the CLI. Two requests are
/// the same job exactly when both fields match; `remove_job` relies on that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub args: Vec<String>,
    pub envs: BTreeMap<String, String>,
}

impl JobRequest {
    pub fn new(args: Vec<String>, envs: BTreeMap<String, String>) -> Self {
        Self { args, envs }
    }

    /// The script path (`args[0]`). Empty argv is rejected upstream.
    pub fn script(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or("")
    }
}

impl fmt::Display for JobRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.args.join(" "))
    }
}

// Waitlist entries appear in the status JSON as `[argv, env_overrides]`
// pairs, so a request serializes as a 2-element sequence rather than a map.
impl Serialize for JobRequest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&self.args)?;
        seq.serialize_element(&self.envs)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for JobRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PairVisitor;

        impl<'de> Visitor<'de> for PairVisitor {
            type Value = JobRequest;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a [argv, env_overrides] pair")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<JobRequest, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let args: Vec<String> =
                    seq.next_element()?.ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let envs: BTreeMap<String, String> =
                    seq.next_element()?.ok_or_else(|| de::Error::invalid_length(1, &self))?;
                Ok(JobRequest { args, envs })
            }
        }

        deserializer.deserialize_seq(PairVisitor)
    }
}

/// Runtime record of a job that has been handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInfo {
    pub id: JobId,
    pub args: Vec<String>,
    #[serde(default)]
    pub envs: BTreeMap<String, String>,
    pub pid: u32,
    pub log_file: PathBuf,
}

impl JobInfo {
    /// The request this record was launched from, for display and matching.
    pub fn request(&self) -> JobRequest {
        JobRequest::new(self.args.clone(), self.envs.clone())
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
