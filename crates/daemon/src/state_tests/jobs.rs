// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn job_without_workers_queues() {
    let h = harness();
    let msg = h.store.add_job(long_job(&h), &no_envs()).unwrap();

    assert_eq!(msg, "All slaves are busy. Job is added to the waiting list.");
    let status = h.store.status();
    assert_eq!(status.job_waitlist.len(), 1);
    assert!(status.slaves.is_empty());
}

#[tokio::test]
async fn job_is_assigned_to_an_idle_worker() {
    let h = harness();
    h.store.add_slave("10.0.0.1", &no_envs()).unwrap();

    let msg = h.store.add_job(long_job(&h), &no_envs()).unwrap();

    assert_eq!(msg, "Job is assigned to 10.0.0.1.");
    let status = h.store.status();
    assert!(status.job_waitlist.is_empty());
    assert_eq!(status.slaves[0].status, WorkerStatus::Busy);
    let job = status.slaves[0].running_job.as_ref().unwrap();
    assert_eq!(job.args, long_job(&h));
    assert!(supervisor::pid_alive(job.pid));
}

#[tokio::test]
async fn waiting_job_starts_when_a_worker_arrives() {
    let h = harness();
    h.store.add_job(long_job(&h), &no_envs()).unwrap();

    h.store.add_slave("10.0.0.1", &no_envs()).unwrap();

    // The new worker is busy before add_slave returns.
    let status = h.store.status();
    assert!(status.job_waitlist.is_empty());
    assert_eq!(status.slaves[0].status, WorkerStatus::Busy);
    assert_eq!(
        status.slaves[0].running_job.as_ref().unwrap().args,
        long_job(&h)
    );
}

#[tokio::test]
async fn jobs_fill_workers_in_registration_order() {
    let h = harness();
    h.store.add_slave("10.0.0.1", &no_envs()).unwrap();
    h.store.add_slave("10.0.0.2", &no_envs()).unwrap();

    let j1 = vec![script(&h, "j1.sh", "sleep 5"), "one".to_string()];
    let j2 = vec![script(&h, "j2.sh", "sleep 5"), "two".to_string()];
    let j3 = vec![script(&h, "j3.sh", "sleep 5"), "three".to_string()];
    h.store.add_job(j1.clone(), &no_envs()).unwrap();
    h.store.add_job(j2.clone(), &no_envs()).unwrap();
    let msg = h.store.add_job(j3.clone(), &no_envs()).unwrap();

    assert_eq!(msg, "All slaves are busy. Job is added to the waiting list.");
    let status = h.store.status();
    assert_eq!(status.slaves[0].running_job.as_ref().unwrap().args, j1);
    assert_eq!(status.slaves[1].running_job.as_ref().unwrap().args, j2);
    assert_eq!(status.job_waitlist, vec![JobRequest::new(j3, Default::default())]);
}

#[tokio::test]
async fn same_millisecond_launches_get_distinct_ids() {
    let h = harness();
    h.store.add_slave("10.0.0.1", &no_envs()).unwrap();
    h.store.add_slave("10.0.0.2", &no_envs()).unwrap();

    // The clock is frozen, so both assignments happen in the same "ms".
    h.store.add_job(long_job(&h), &no_envs()).unwrap();
    h.store.add_job(long_job(&h), &no_envs()).unwrap();

    let status = h.store.status();
    let id0 = status.slaves[0].running_job.as_ref().unwrap().id.clone();
    let id1 = status.slaves[1].running_job.as_ref().unwrap().id.clone();
    assert_ne!(id0, id1);
}

#[tokio::test]
async fn reserved_env_is_rejected() {
    let h = harness();
    let err = h
        .store
        .add_job(long_job(&h), &["JOB_ID=x".to_string()])
        .unwrap_err();
    assert_eq!(err.to_string(), "Environment name JOB_ID is reserved.");
    assert!(h.store.status().job_waitlist.is_empty());
}

#[tokio::test]
async fn malformed_env_is_rejected() {
    let h = harness();
    let err = h.store.add_job(long_job(&h), &["NOEQUALS".to_string()]).unwrap_err();
    assert!(matches!(err, StoreError::Env(EnvError::Malformed(_))));
}

#[tokio::test]
async fn empty_argv_is_rejected() {
    let h = harness();
    let err = h.store.add_job(Vec::new(), &no_envs()).unwrap_err();
    assert!(matches!(err, StoreError::EmptyArgs));
}

#[tokio::test]
async fn duplicate_submissions_queue_twice_and_remove_once() {
    let h = harness();
    let job = long_job(&h);
    h.store.add_job(job.clone(), &no_envs()).unwrap();
    h.store.add_job(job.clone(), &no_envs()).unwrap();
    assert_eq!(h.store.status().job_waitlist.len(), 2);

    let msg = h.store.remove_job(job.clone(), &no_envs()).unwrap();
    assert_eq!(msg, "The job is removed from the waitlist.");
    assert_eq!(h.store.status().job_waitlist.len(), 1);
}

#[tokio::test]
async fn remove_job_matches_structurally() {
    let h = harness();
    let job = long_job(&h);
    h.store.add_job(job.clone(), &["K=1".to_string()]).unwrap();

    // Same argv, different envs: no match.
    let msg = h.store.remove_job(job.clone(), &["K=2".to_string()]).unwrap();
    assert_eq!(msg, "The job is not in the waitlist.");
    assert_eq!(h.store.status().job_waitlist.len(), 1);

    let msg = h.store.remove_job(job, &["K=1".to_string()]).unwrap();
    assert_eq!(msg, "The job is removed from the waitlist.");
    assert!(h.store.status().job_waitlist.is_empty());
}

#[tokio::test]
async fn unlaunchable_job_is_dropped_not_requeued() {
    let h = harness();
    h.store.add_slave("10.0.0.1", &no_envs()).unwrap();

    let missing = h.dir.path().join("missing.sh").to_string_lossy().into_owned();
    let msg = h.store.add_job(vec![missing], &no_envs()).unwrap();

    assert_eq!(msg, "Job could not be started; check the daemon log.");
    let status = h.store.status();
    assert!(status.job_waitlist.is_empty());
    assert_eq!(status.slaves[0].status, WorkerStatus::Idle);
}
