// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Assignment-policy scenarios across the store and scheduler.

use std::collections::BTreeMap;

use jh_core::{JobRequest, WorkerStatus};
use jh_daemon::protocol::RemoveOptions;

use super::support::*;

fn no_envs() -> Vec<String> {
    Vec::new()
}

#[tokio::test(flavor = "multi_thread")]
async fn queued_job_lands_on_the_first_registered_worker() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let job = vec![script(dir.path(), "job.sh", "sleep 5"), "a".to_string()];

    store.add_job(job.clone(), &no_envs()).unwrap();
    store.add_slave("10.0.0.1", &no_envs()).unwrap();

    let status = store.status();
    assert!(status.job_waitlist.is_empty());
    assert_eq!(status.slaves[0].ip, "10.0.0.1");
    assert_eq!(status.slaves[0].status, WorkerStatus::Busy);
    assert_eq!(status.slaves[0].running_job.as_ref().unwrap().args, job);
}

#[tokio::test(flavor = "multi_thread")]
async fn registering_the_same_address_twice_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    store.add_slave("10.0.0.1", &no_envs()).unwrap();
    let err = store.add_slave("10.0.0.1", &no_envs()).unwrap_err();
    assert_eq!(err.to_string(), "10.0.0.1 is already added");
}

#[tokio::test(flavor = "multi_thread")]
async fn three_jobs_two_workers_leaves_one_waiting() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    store.add_slave("10.0.0.1", &no_envs()).unwrap();
    store.add_slave("10.0.0.2", &no_envs()).unwrap();

    let j1 = vec![script(dir.path(), "j1.sh", "sleep 5")];
    let j2 = vec![script(dir.path(), "j2.sh", "sleep 5")];
    let j3 = vec![script(dir.path(), "j3.sh", "sleep 5")];
    store.add_job(j1.clone(), &no_envs()).unwrap();
    store.add_job(j2.clone(), &no_envs()).unwrap();
    store.add_job(j3.clone(), &no_envs()).unwrap();

    let status = store.status();
    assert_eq!(status.slaves[0].running_job.as_ref().unwrap().args, j1);
    assert_eq!(status.slaves[1].running_job.as_ref().unwrap().args, j2);
    assert_eq!(
        status.job_waitlist,
        vec![JobRequest::new(j3, BTreeMap::new())]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn busy_count_always_matches_running_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    store.add_slave("10.0.0.1", &no_envs()).unwrap();
    store.add_slave("10.0.0.2", &no_envs()).unwrap();
    store.add_slave("10.0.0.3", &no_envs()).unwrap();
    store.add_job(vec![script(dir.path(), "j1.sh", "sleep 5")], &no_envs()).unwrap();
    store.add_job(vec![script(dir.path(), "j2.sh", "sleep 5")], &no_envs()).unwrap();

    let status = store.status();
    let busy = status
        .slaves
        .iter()
        .filter(|s| s.status == WorkerStatus::Busy)
        .count();
    let running = status
        .slaves
        .iter()
        .filter(|s| s.running_job.is_some())
        .count();
    assert_eq!(busy, 2);
    assert_eq!(busy, running);
}

#[tokio::test(flavor = "multi_thread")]
async fn busy_worker_removal_needs_an_option() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    store.add_slave("10.0.0.1", &no_envs()).unwrap();
    store.add_job(vec![script(dir.path(), "job.sh", "sleep 5")], &no_envs()).unwrap();

    let err = store
        .remove_slave("10.0.0.1", RemoveOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("--wait or --kill"));

    store
        .remove_slave("10.0.0.1", RemoveOptions { wait: true, kill: false })
        .await
        .unwrap();
    let status = store.status();
    assert!(status.slaves[0].remove_after_finish);
    assert_eq!(status.slaves[0].status, WorkerStatus::Removing);
}
