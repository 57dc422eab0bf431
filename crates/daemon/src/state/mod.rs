// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The state store: workers, the job waitlist, and every mutation on them.
//!
//! One mutex guards the whole aggregate. Every public operation locks it
//! once, mutates, writes the snapshot before releasing, and — where the
//! operation can free or add capacity — runs the scheduler. Supervisor
//! tasks call back into [`Store::complete_job`] through a cloned handle,
//! so mutation never happens outside this module.

mod scheduler;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{error, info, warn};

use jh_core::{parse_env_pairs, Clock, EnvError, JobRequest, SystemClock, Worker, WorkerStatus};

use crate::env;
use crate::protocol::{RemoveOptions, StatusView};
use crate::storage::{self, Snapshot, SnapshotError};
use crate::supervisor::{self, Monitor};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Env(#[from] EnvError),

    #[error("No job script given.")]
    EmptyArgs,

    #[error("{0} is already added")]
    DuplicateSlave(String),

    #[error("{0} is not registered.")]
    UnknownSlave(String),

    #[error("{0} is busy. Use --wait or --kill to remove it.")]
    SlaveBusy(String),

    #[error("{0} is already marked for removal.")]
    AlreadyRemoving(String),

    #[error("cannot read status file {}: {source}", .path.display())]
    ReadStatus { path: PathBuf, source: std::io::Error },

    #[error("cannot parse status file {}: {source}", .path.display())]
    ParseStatus { path: PathBuf, source: serde_json::Error },
}

/// Filesystem locations the store persists to.
pub struct StorePaths {
    pub snapshot: PathBuf,
    pub log_dir: PathBuf,
}

pub(crate) struct WorkerEntry {
    pub(crate) worker: Worker,
    pub(crate) monitor: Option<Monitor>,
}

#[derive(Default)]
pub(crate) struct StoreInner {
    pub(crate) workers: Vec<WorkerEntry>,
    pub(crate) waitlist: VecDeque<JobRequest>,
    pub(crate) should_stop: bool,
    // Floor for job-id minting so two launches in the same millisecond
    // still get distinct ids (and distinct log files).
    pub(crate) last_job_ms: u64,
}

/// Handle to the shared store. Cheap to clone; supervisors hold one.
pub struct Store<C: Clock = SystemClock> {
    inner: Arc<Mutex<StoreInner>>,
    paths: Arc<StorePaths>,
    clock: C,
}

impl<C: Clock> Clone for Store<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            paths: Arc::clone(&self.paths),
            clock: self.clock.clone(),
        }
    }
}

impl<C: Clock + 'static> Store<C> {
    /// Open the store, loading the snapshot if one exists and re-attaching
    /// supervisors to workers whose jobs were running when the previous
    /// process stopped.
    pub fn open(paths: StorePaths, clock: C) -> Result<Self, SnapshotError> {
        let snapshot = storage::load(&paths.snapshot)?;
        let store = Self {
            inner: Arc::new(Mutex::new(StoreInner::default())),
            paths: Arc::new(paths),
            clock,
        };
        if let Some(snapshot) = snapshot {
            let mut inner = store.inner.lock();
            inner.waitlist = snapshot.waitlist;
            inner.workers = snapshot
                .workers
                .into_iter()
                .map(|worker| WorkerEntry { worker, monitor: None })
                .collect();
            info!(
                workers = inner.workers.len(),
                waiting = inner.waitlist.len(),
                "loaded snapshot"
            );
            store.associate_locked(&mut inner);
        }
        Ok(store)
    }

    /// Queue a job, assigning it immediately if a worker is idle.
    pub fn add_job(&self, args: Vec<String>, envs: &[String]) -> Result<String, StoreError> {
        if args.is_empty() {
            return Err(StoreError::EmptyArgs);
        }
        let envs = parse_env_pairs(envs)?;
        let mut inner = self.inner.lock();
        inner.waitlist.push_back(JobRequest::new(args, envs));
        let assigned = self.schedule_locked(&mut inner);
        self.persist(&inner);
        Ok(if !inner.waitlist.is_empty() {
            "All slaves are busy. Job is added to the waiting list.".to_string()
        } else if let Some(ip) = assigned {
            format!("Job is assigned to {}.", ip)
        } else {
            "Job could not be started; check the daemon log.".to_string()
        })
    }

    /// Remove the first waitlisted job that matches `args` and `envs`
    /// exactly. A miss is reported, not an error.
    pub fn remove_job(&self, args: Vec<String>, envs: &[String]) -> Result<String, StoreError> {
        if args.is_empty() {
            return Err(StoreError::EmptyArgs);
        }
        let job = JobRequest::new(args, parse_env_pairs(envs)?);
        let mut inner = self.inner.lock();
        match inner.waitlist.iter().position(|queued| *queued == job) {
            Some(idx) => {
                inner.waitlist.remove(idx);
                self.persist(&inner);
                Ok("The job is removed from the waitlist.".to_string())
            }
            None => Ok("The job is not in the waitlist.".to_string()),
        }
    }

    /// Register a worker. If jobs are waiting, the new worker picks one up
    /// before this returns.
    pub fn add_slave(&self, ip: &str, envs: &[String]) -> Result<String, StoreError> {
        let envs = parse_env_pairs(envs)?;
        let mut inner = self.inner.lock();
        if inner.workers.iter().any(|e| e.worker.ip == ip) {
            return Err(StoreError::DuplicateSlave(ip.to_string()));
        }
        inner.workers.push(WorkerEntry { worker: Worker::new(ip, envs), monitor: None });
        info!(ip, "worker registered");
        self.schedule_locked(&mut inner);
        self.persist(&inner);
        Ok("ok".to_string())
    }

    /// Deregister a worker.
    ///
    /// Idle workers go immediately. A busy worker needs `--wait` (remove
    /// once the job finishes) or `--kill`: detach the supervisor, SIGTERM
    /// the job (SIGKILL after the grace period), and drop the worker —
    /// it is not re-monitored on reload.
    pub async fn remove_slave(
        &self,
        ip: &str,
        options: RemoveOptions,
    ) -> Result<String, StoreError> {
        enum Plan {
            Done,
            Kill { monitor: Option<Monitor>, pid: Option<u32> },
        }

        let plan = {
            let mut inner = self.inner.lock();
            let idx = inner
                .workers
                .iter()
                .position(|e| e.worker.ip == ip)
                .ok_or_else(|| StoreError::UnknownSlave(ip.to_string()))?;
            match inner.workers[idx].worker.status {
                WorkerStatus::Removing => {
                    return Err(StoreError::AlreadyRemoving(ip.to_string()))
                }
                WorkerStatus::Idle | WorkerStatus::Removed => {
                    inner.workers.remove(idx);
                    self.persist(&inner);
                    info!(ip, "worker removed");
                    Plan::Done
                }
                WorkerStatus::Busy if options.kill => {
                    let entry = &mut inner.workers[idx];
                    entry.worker.status = WorkerStatus::Removing;
                    entry.worker.remove_after_finish = true;
                    let monitor = entry.monitor.take();
                    let pid = entry.worker.running_job.as_ref().map(|job| job.pid);
                    self.persist(&inner);
                    Plan::Kill { monitor, pid }
                }
                WorkerStatus::Busy if options.wait => {
                    let entry = &mut inner.workers[idx];
                    entry.worker.status = WorkerStatus::Removing;
                    entry.worker.remove_after_finish = true;
                    self.persist(&inner);
                    info!(ip, "worker will be removed when its job finishes");
                    Plan::Done
                }
                WorkerStatus::Busy => return Err(StoreError::SlaveBusy(ip.to_string())),
            }
        };

        if let Plan::Kill { monitor, pid } = plan {
            if let Some(monitor) = monitor {
                monitor.detach().await;
            }
            if let Some(pid) = pid {
                supervisor::terminate(pid, env::kill_grace());
            }
            let mut inner = self.inner.lock();
            if let Some(idx) = inner.workers.iter().position(|e| e.worker.ip == ip) {
                inner.workers.remove(idx);
            }
            self.persist(&inner);
            info!(ip, "worker killed and removed");
        }
        Ok("ok".to_string())
    }

    /// The full waitlist + worker state.
    pub fn status(&self) -> StatusView {
        let inner = self.inner.lock();
        StatusView {
            job_waitlist: inner.waitlist.iter().cloned().collect(),
            slaves: inner.workers.iter().map(|e| e.worker.clone()).collect(),
        }
    }

    /// Replace the in-memory state from a status JSON file and re-attach
    /// supervisors for workers that report a running job.
    pub fn load_status(&self, file: &Path) -> Result<String, StoreError> {
        let text = std::fs::read_to_string(file).map_err(|source| StoreError::ReadStatus {
            path: file.to_path_buf(),
            source,
        })?;
        let view: StatusView =
            serde_json::from_str(&text).map_err(|source| StoreError::ParseStatus {
                path: file.to_path_buf(),
                source,
            })?;

        let stale = {
            let mut inner = self.inner.lock();
            let stale: Vec<Monitor> =
                inner.workers.iter_mut().filter_map(|e| e.monitor.take()).collect();
            inner.waitlist = view.job_waitlist.into();
            inner.workers = view
                .slaves
                .into_iter()
                .map(|worker| WorkerEntry { worker, monitor: None })
                .collect();
            self.associate_locked(&mut inner);
            self.schedule_locked(&mut inner);
            self.persist(&inner);
            stale
        };
        // Supervisors of the replaced state detach on their next poll.
        for monitor in stale {
            monitor.signal_detach();
        }
        Ok("ok".to_string())
    }

    /// Persist and stop. Supervisors are signalled and joined; they leave
    /// their workers' state intact so running jobs are re-monitored by the
    /// next process.
    pub async fn shutdown(&self) {
        let monitors: Vec<Monitor> = {
            let mut inner = self.inner.lock();
            inner.should_stop = true;
            self.persist(&inner);
            inner.workers.iter_mut().filter_map(|e| e.monitor.take()).collect()
        };
        for monitor in &monitors {
            monitor.signal_detach();
        }
        for monitor in monitors {
            monitor.join().await;
        }
        info!("state store stopped; running jobs left for re-monitoring");
    }

    pub fn should_stop(&self) -> bool {
        self.inner.lock().should_stop
    }

    /// Run the scheduler once outside any other operation. Used at startup
    /// after the snapshot is loaded.
    pub fn schedule_pending(&self) {
        let mut inner = self.inner.lock();
        if self.schedule_locked(&mut inner).is_some() {
            self.persist(&inner);
        }
    }

    /// Completion callback from a supervisor: free (or drop) the worker
    /// and hand the capacity to waiting jobs.
    pub(crate) fn complete_job(&self, ip: &str) {
        let mut inner = self.inner.lock();
        let Some(idx) = inner.workers.iter().position(|e| e.worker.ip == ip) else {
            // Worker was killed or replaced while the watcher was exiting.
            return;
        };

        let finished = {
            let entry = &mut inner.workers[idx];
            entry.monitor = None;
            entry.worker.running_job.take()
        };
        let Some(job) = finished else {
            warn!(ip, "completion for a worker with no running job");
            return;
        };
        info!(job_id = %job.id, ip, log = %job.log_file.display(), "finished job");

        if inner.workers[idx].worker.remove_after_finish {
            inner.workers.remove(idx);
            info!(ip, "worker removed after its final job");
        } else {
            inner.workers[idx].worker.status = WorkerStatus::Idle;
        }
        self.schedule_locked(&mut inner);
        self.persist(&inner);
    }

    /// Start supervisors for loaded workers that report a running job.
    /// Workers claiming to be busy without one are normalized to idle.
    fn associate_locked(&self, inner: &mut StoreInner) {
        for entry in inner.workers.iter_mut() {
            if entry.monitor.is_some() {
                continue;
            }
            match &entry.worker.running_job {
                Some(job) => {
                    info!(ip = %entry.worker.ip, job_id = %job.id, pid = job.pid, "re-monitoring job");
                    entry.monitor = Some(supervisor::start(
                        self.clone(),
                        entry.worker.ip.clone(),
                        job.pid,
                        None,
                    ));
                }
                None if entry.worker.status.is_occupied() => {
                    warn!(ip = %entry.worker.ip, "worker marked busy with no job; resetting to idle");
                    entry.worker.status = WorkerStatus::Idle;
                    entry.worker.remove_after_finish = false;
                }
                None => {}
            }
        }
    }

    /// Write the snapshot. Called before every lock release on a mutating
    /// path; a failed write is logged and the in-memory state stands.
    fn persist(&self, inner: &StoreInner) {
        let snapshot = Snapshot::new(
            inner.workers.iter().map(|e| e.worker.clone()).collect(),
            inner.waitlist.clone(),
        );
        if let Err(e) = storage::save(&self.paths.snapshot, &snapshot) {
            error!(path = %self.paths.snapshot.display(), error = %e, "failed to write snapshot");
        }
    }
}

#[cfg(test)]
#[path = "../state_tests/mod.rs"]
mod tests;
