// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn add_slave_reports_ok() {
    let h = harness();
    assert_eq!(h.store.add_slave("10.0.0.1", &no_envs()).unwrap(), "ok");
    let status = h.store.status();
    assert_eq!(status.slaves[0].ip, "10.0.0.1");
    assert_eq!(status.slaves[0].status, WorkerStatus::Idle);
}

#[tokio::test]
async fn duplicate_slave_is_rejected() {
    let h = harness();
    h.store.add_slave("10.0.0.1", &no_envs()).unwrap();

    let err = h.store.add_slave("10.0.0.1", &no_envs()).unwrap_err();
    assert_eq!(err.to_string(), "10.0.0.1 is already added");
    assert_eq!(h.store.status().slaves.len(), 1);
}

#[tokio::test]
async fn slave_env_defaults_are_validated() {
    let h = harness();
    let err = h
        .store
        .add_slave("10.0.0.1", &["SLAVE_IP=fake".to_string()])
        .unwrap_err();
    assert_eq!(err.to_string(), "Environment name SLAVE_IP is reserved.");
    assert!(h.store.status().slaves.is_empty());
}

#[tokio::test]
async fn idle_slave_is_removed_immediately() {
    let h = harness();
    h.store.add_slave("10.0.0.1", &no_envs()).unwrap();

    let msg = h
        .store
        .remove_slave("10.0.0.1", RemoveOptions::default())
        .await
        .unwrap();
    assert_eq!(msg, "ok");
    assert!(h.store.status().slaves.is_empty());
}

#[tokio::test]
async fn unknown_slave_is_an_error() {
    let h = harness();
    let err = h
        .store
        .remove_slave("10.9.9.9", RemoveOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::UnknownSlave(_)));
}

#[tokio::test]
async fn busy_slave_needs_wait_or_kill() {
    let h = harness();
    h.store.add_slave("10.0.0.1", &no_envs()).unwrap();
    h.store.add_job(long_job(&h), &no_envs()).unwrap();

    let err = h
        .store
        .remove_slave("10.0.0.1", RemoveOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "10.0.0.1 is busy. Use --wait or --kill to remove it.");
    assert_eq!(h.store.status().slaves.len(), 1);
}

#[tokio::test]
async fn wait_marks_the_slave_for_removal() {
    let h = harness();
    h.store.add_slave("10.0.0.1", &no_envs()).unwrap();
    h.store.add_job(long_job(&h), &no_envs()).unwrap();

    let msg = h
        .store
        .remove_slave("10.0.0.1", RemoveOptions { wait: true, kill: false })
        .await
        .unwrap();
    assert_eq!(msg, "ok");

    let status = h.store.status();
    assert_eq!(status.slaves[0].status, WorkerStatus::Removing);
    assert!(status.slaves[0].remove_after_finish);
    assert!(status.slaves[0].running_job.is_some());
}

#[tokio::test]
async fn marking_for_removal_twice_is_an_error() {
    let h = harness();
    h.store.add_slave("10.0.0.1", &no_envs()).unwrap();
    h.store.add_job(long_job(&h), &no_envs()).unwrap();
    h.store
        .remove_slave("10.0.0.1", RemoveOptions { wait: true, kill: false })
        .await
        .unwrap();

    let err = h
        .store
        .remove_slave("10.0.0.1", RemoveOptions { wait: true, kill: false })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::AlreadyRemoving(_)));
}

#[tokio::test]
async fn kill_removes_the_slave_and_its_process() {
    let h = harness();
    h.store.add_slave("10.0.0.1", &no_envs()).unwrap();
    h.store.add_job(long_job(&h), &no_envs()).unwrap();
    let pid = h.store.status().slaves[0].running_job.as_ref().unwrap().pid;
    assert!(supervisor::pid_alive(pid));

    let msg = h
        .store
        .remove_slave("10.0.0.1", RemoveOptions { wait: false, kill: true })
        .await
        .unwrap();
    assert_eq!(msg, "ok");

    assert!(h.store.status().slaves.is_empty());
    assert!(
        wait_for(|| !supervisor::pid_alive(pid), Duration::from_secs(2)).await,
        "job process should die after SIGTERM"
    );
}

#[tokio::test]
async fn removed_slave_frees_no_capacity_for_waiting_jobs() {
    let h = harness();
    h.store.add_slave("10.0.0.1", &no_envs()).unwrap();
    h.store.add_job(long_job(&h), &no_envs()).unwrap();
    h.store.add_job(long_job(&h), &no_envs()).unwrap();
    assert_eq!(h.store.status().job_waitlist.len(), 1);

    h.store
        .remove_slave("10.0.0.1", RemoveOptions { wait: false, kill: true })
        .await
        .unwrap();

    // The killed worker is gone; the queued job keeps waiting.
    let status = h.store.status();
    assert!(status.slaves.is_empty());
    assert_eq!(status.job_waitlist.len(), 1);
}
