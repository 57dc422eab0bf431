// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash/restart scenarios: supervisors detaching, re-attaching, and
//! completing against real child processes.

use std::time::Duration;

use jh_core::{FakeClock, WorkerStatus};
use jh_daemon::protocol::RemoveOptions;
use jh_daemon::supervisor::pid_alive;
use serial_test::serial;

use super::support::*;

fn no_envs() -> Vec<String> {
    Vec::new()
}

fn fast_poll() {
    std::env::set_var("JOBHERD_POLL_MS", "25");
}

fn default_poll() {
    std::env::remove_var("JOBHERD_POLL_MS");
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn completed_job_re_idles_the_worker_and_pulls_the_next() {
    fast_poll();
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    store.add_slave("10.0.0.1", &no_envs()).unwrap();

    let first = gated_job(dir.path(), "first_done");
    let second = gated_job(dir.path(), "second_done");
    store.add_job(first, &no_envs()).unwrap();
    store.add_job(second.clone(), &no_envs()).unwrap();
    assert_eq!(store.status().job_waitlist.len(), 1);

    release_gate(dir.path(), "first_done");

    // The supervisor notices the exit and the freed worker takes job two.
    let picked_up = {
        let store = store.clone();
        let second = second.clone();
        wait_for(
            move || {
                let status = store.status();
                status.job_waitlist.is_empty()
                    && status.slaves[0]
                        .running_job
                        .as_ref()
                        .is_some_and(|j| j.args == second)
            },
            Duration::from_secs(5),
        )
        .await
    };
    assert!(picked_up, "second job was never started");
    default_poll();
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn restart_re_monitors_running_jobs_to_completion() {
    fast_poll();
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_700_000_000_000);

    // First daemon: assign a job, then stop without touching it.
    let store = open_store_with(&dir, &clock);
    store.add_slave("10.0.0.1", &no_envs()).unwrap();
    store.add_job(gated_job(dir.path(), "done"), &no_envs()).unwrap();
    let pid = store.status().slaves[0].running_job.as_ref().unwrap().pid;
    store.shutdown().await;
    assert!(pid_alive(pid), "shutdown must not kill the running job");

    // Second daemon: the worker comes back busy with a live supervisor.
    let store = open_store_with(&dir, &clock);
    let status = store.status();
    assert_eq!(status.slaves[0].status, WorkerStatus::Busy);
    assert_eq!(status.slaves[0].running_job.as_ref().unwrap().pid, pid);

    release_gate(dir.path(), "done");
    let idled = {
        let store = store.clone();
        wait_for(
            move || store.status().slaves[0].status == WorkerStatus::Idle,
            Duration::from_secs(5),
        )
        .await
    };
    assert!(idled, "re-attached supervisor never completed the job");
    assert!(!pid_alive(pid));
    default_poll();
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn waited_removal_takes_effect_on_completion() {
    fast_poll();
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    store.add_slave("10.0.0.1", &no_envs()).unwrap();
    store.add_job(gated_job(dir.path(), "done"), &no_envs()).unwrap();

    store
        .remove_slave("10.0.0.1", RemoveOptions { wait: true, kill: false })
        .await
        .unwrap();
    assert_eq!(store.status().slaves.len(), 1);

    release_gate(dir.path(), "done");
    let gone = {
        let store = store.clone();
        wait_for(move || store.status().slaves.is_empty(), Duration::from_secs(5)).await
    };
    assert!(gone, "worker should vanish once its job finishes");
    default_poll();
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn killed_worker_is_not_re_monitored_after_restart() {
    fast_poll();
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_700_000_000_000);
    let store = open_store_with(&dir, &clock);
    store.add_slave("10.0.0.1", &no_envs()).unwrap();
    store.add_job(gated_job(dir.path(), "never"), &no_envs()).unwrap();
    let pid = store.status().slaves[0].running_job.as_ref().unwrap().pid;

    store
        .remove_slave("10.0.0.1", RemoveOptions { wait: false, kill: true })
        .await
        .unwrap();
    assert!(
        wait_for(move || !pid_alive(pid), Duration::from_secs(2)).await,
        "killed job should be gone"
    );

    let store = open_store_with(&dir, &clock);
    assert!(store.status().slaves.is_empty());
    default_poll();
}
