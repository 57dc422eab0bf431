// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The process launcher: spawn a job script detached from the daemon.
//!
//! The child runs in its own process group with stdout and stderr routed to
//! the job's log file, so it survives daemon restarts and its output is
//! observable after the fact.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::info;

use jh_core::{merge_job_env, JobId, JobInfo, JobRequest, Worker};

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to create log file {}: {source}", .path.display())]
    LogFile { path: PathBuf, source: std::io::Error },

    #[error("failed to spawn {script}: {source}")]
    Spawn { script: String, source: std::io::Error },

    #[error("spawned {script} but no pid was reported")]
    NoPid { script: String },
}

/// A launched job: the record for the worker plus the live child handle.
pub struct Launched {
    pub info: JobInfo,
    pub child: Child,
}

/// Spawn `job` on behalf of `worker`.
///
/// The log directory is created on demand; the log file is
/// `{log_dir}/job_{id}.txt`. The injected environment is the reserved
/// `JOB_ID`/`SLAVE_IP` pair, the worker's defaults, then the job's
/// overrides, layered onto the daemon's own environment.
pub fn launch(
    job: &JobRequest,
    worker: &Worker,
    log_dir: &Path,
    id: JobId,
) -> Result<Launched, SpawnError> {
    std::fs::create_dir_all(log_dir).map_err(|source| SpawnError::LogFile {
        path: log_dir.to_path_buf(),
        source,
    })?;
    let log_file = log_dir.join(format!("job_{}.txt", id));
    let out = File::create(&log_file).map_err(|source| SpawnError::LogFile {
        path: log_file.clone(),
        source,
    })?;
    let err = out.try_clone().map_err(|source| SpawnError::LogFile {
        path: log_file.clone(),
        source,
    })?;

    let env = merge_job_env(id.as_str(), &worker.ip, &worker.envs, &job.envs);

    info!(job_id = %id, ip = %worker.ip, log = %log_file.display(), "running job");
    info!("{}", job);

    let mut command = Command::new(job.script());
    command
        .args(job.args.iter().skip(1))
        .envs(&env)
        .stdin(Stdio::null())
        .stdout(Stdio::from(out))
        .stderr(Stdio::from(err))
        .process_group(0);

    let child = command.spawn().map_err(|source| SpawnError::Spawn {
        script: job.script().to_string(),
        source,
    })?;
    let pid = child.id().ok_or_else(|| SpawnError::NoPid { script: job.script().to_string() })?;

    Ok(Launched {
        info: JobInfo {
            id,
            args: job.args.clone(),
            envs: job.envs.clone(),
            pid,
            log_file,
        },
        child,
    })
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
