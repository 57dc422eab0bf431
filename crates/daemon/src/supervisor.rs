// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job supervision.
//!
//! Every running job gets one watcher task. It polls liveness at the
//! configured interval and hands the completion back to the store, which
//! re-idles (or removes) the worker and schedules waiting jobs. A
//! cancelled watcher detaches without touching worker state so a later
//! process can resume monitoring from the snapshot.

use std::time::Duration;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::process::Child;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use jh_core::Clock;

use crate::env;
use crate::state::Store;

/// Handle to a running watcher task. Owned by the worker's store entry;
/// never serialized.
pub(crate) struct Monitor {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Monitor {
    /// Ask the watcher to detach. It returns within one poll interval and
    /// leaves the worker's persisted state intact.
    pub(crate) fn signal_detach(&self) {
        self.cancel.cancel();
    }

    /// Wait for the watcher task to finish.
    pub(crate) async fn join(self) {
        let _ = self.task.await;
    }

    /// Detach and wait.
    pub(crate) async fn detach(self) {
        self.signal_detach();
        self.join().await;
    }
}

/// Start watching `pid` on behalf of the worker at `ip`.
///
/// `child` is present for jobs spawned by this process; jobs re-attached
/// after a restart are watched through the pid alone.
pub(crate) fn start<C: Clock + 'static>(
    store: Store<C>,
    ip: String,
    pid: u32,
    child: Option<Child>,
) -> Monitor {
    let cancel = CancellationToken::new();
    let task = tokio::spawn(watch(store, ip, pid, child, cancel.clone()));
    Monitor { cancel, task }
}

async fn watch<C: Clock + 'static>(
    store: Store<C>,
    ip: String,
    pid: u32,
    mut child: Option<Child>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(env::poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(ip = %ip, pid, "supervisor detached; worker state kept for re-monitoring");
                return;
            }
            _ = ticker.tick() => {
                if !pid_alive(pid) {
                    break;
                }
                // An errored wait means the child is gone; treat as done.
                if let Some(child) = child.as_mut() {
                    match child.try_wait() {
                        Ok(None) => {}
                        Ok(Some(_)) | Err(_) => break,
                    }
                }
            }
        }
    }

    store.complete_job(&ip);
}

/// Whether a process with `pid` exists (signal 0 probe).
pub fn pid_alive(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

/// Terminate a job process: SIGTERM now, SIGKILL after the grace period if
/// the pid is still around.
pub(crate) fn terminate(pid: u32, grace: Duration) {
    let target = Pid::from_raw(pid as i32);
    if let Err(errno) = kill(target, Signal::SIGTERM) {
        debug!(pid, %errno, "SIGTERM not delivered (process likely already gone)");
        return;
    }
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        if pid_alive(pid) {
            warn!(pid, "still alive after grace period, sending SIGKILL");
            let _ = kill(target, Signal::SIGKILL);
        }
    });
}
