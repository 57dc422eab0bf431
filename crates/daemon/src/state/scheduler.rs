// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Assignment policy.
//!
//! Deterministic and greedy: the waitlist is strictly FIFO, workers are
//! scanned in registration order, and the leftmost idle worker wins. One
//! call drains as many jobs as there are idle workers.

use tracing::error;

use jh_core::{Clock, JobId, WorkerStatus};

use super::{Store, StoreInner};
use crate::{spawn, supervisor};

impl<C: Clock + 'static> Store<C> {
    /// Assign waiting jobs to idle workers until one side runs out.
    /// Returns the address of the last worker assigned, for messaging.
    ///
    /// Must be called with `inner` locked by the current operation.
    pub(crate) fn schedule_locked(&self, inner: &mut StoreInner) -> Option<String> {
        // A completion racing shutdown must not launch anything new.
        if inner.should_stop {
            return None;
        }
        let mut assigned = None;
        while !inner.waitlist.is_empty() {
            let Some(idx) = inner.workers.iter().position(|e| e.worker.is_idle()) else {
                break;
            };
            let Some(job) = inner.waitlist.pop_front() else {
                break;
            };
            let id = self.mint_job_id(inner);
            let entry = &mut inner.workers[idx];
            match spawn::launch(&job, &entry.worker, &self.paths.log_dir, id) {
                Ok(launched) => {
                    let pid = launched.info.pid;
                    entry.worker.status = WorkerStatus::Busy;
                    entry.worker.running_job = Some(launched.info);
                    entry.monitor = Some(supervisor::start(
                        self.clone(),
                        entry.worker.ip.clone(),
                        pid,
                        Some(launched.child),
                    ));
                    assigned = Some(entry.worker.ip.clone());
                }
                Err(e) => {
                    // The worker stays idle; the job is dropped rather than
                    // requeued, or it would wedge the head of the queue.
                    error!(job = %job, error = %e, "failed to launch job, dropping it");
                }
            }
        }
        assigned
    }

    /// Job ids are launch timestamps in epoch milliseconds. Launches that
    /// share a millisecond are bumped forward so ids (and log files) stay
    /// unique.
    fn mint_job_id(&self, inner: &mut StoreInner) -> JobId {
        let ms = self.clock.epoch_ms().max(inner.last_job_ms + 1);
        inner.last_job_ms = ms;
        JobId(ms.to_string())
    }
}
