// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn completion_re_idles_the_worker_and_schedules() {
    let h = harness();
    h.store.add_slave("10.0.0.1", &no_envs()).unwrap();
    let first = long_job(&h);
    let second = vec![script(&h, "second.sh", "sleep 5")];
    h.store.add_job(first, &no_envs()).unwrap();
    h.store.add_job(second.clone(), &no_envs()).unwrap();
    assert_eq!(h.store.status().job_waitlist.len(), 1);

    h.store.complete_job("10.0.0.1");

    // The freed worker immediately picks up the waiting job.
    let status = h.store.status();
    assert!(status.job_waitlist.is_empty());
    assert_eq!(status.slaves[0].status, WorkerStatus::Busy);
    assert_eq!(status.slaves[0].running_job.as_ref().unwrap().args, second);
}

#[tokio::test]
async fn completion_under_removal_drops_the_worker() {
    let h = harness();
    h.store.add_slave("10.0.0.1", &no_envs()).unwrap();
    h.store.add_job(long_job(&h), &no_envs()).unwrap();
    h.store
        .remove_slave("10.0.0.1", RemoveOptions { wait: true, kill: false })
        .await
        .unwrap();

    h.store.complete_job("10.0.0.1");

    assert!(h.store.status().slaves.is_empty());
}

#[tokio::test]
async fn every_mutation_is_reloadable() {
    let h = harness();
    h.store.add_slave("10.0.0.1", &no_envs()).unwrap();
    h.store.add_slave("10.0.0.2", &["GPU=0".to_string()]).unwrap();
    h.store.add_job(long_job(&h), &no_envs()).unwrap();
    h.store.add_job(long_job(&h), &no_envs()).unwrap();
    h.store.add_job(long_job(&h), &no_envs()).unwrap();

    let reloaded = open_at(&h.dir, &h.clock);

    assert_eq!(reloaded.status(), h.store.status());
}

#[tokio::test]
async fn reopened_store_re_monitors_running_jobs() {
    let h = harness();
    h.store.add_slave("10.0.0.1", &no_envs()).unwrap();
    h.store.add_job(long_job(&h), &no_envs()).unwrap();
    let pid = h.store.status().slaves[0].running_job.as_ref().unwrap().pid;

    h.store.shutdown().await;
    assert!(h.store.should_stop());

    // Shutdown leaves the running job's state intact on disk.
    let reloaded = open_at(&h.dir, &h.clock);
    let status = reloaded.status();
    assert_eq!(status.slaves[0].status, WorkerStatus::Busy);
    assert_eq!(status.slaves[0].running_job.as_ref().unwrap().pid, pid);
    assert!(supervisor::pid_alive(pid));
}

#[tokio::test]
async fn status_then_load_status_is_a_no_op() {
    let h = harness();
    h.store.add_slave("10.0.0.1", &["GPU=1".to_string()]).unwrap();
    h.store.add_job(long_job(&h), &no_envs()).unwrap();
    h.store.add_job(long_job(&h), &["K=v".to_string()]).unwrap();
    let before = h.store.status();

    let file = h.dir.path().join("status.json");
    std::fs::write(&file, serde_json::to_string(&before).unwrap()).unwrap();
    h.store.load_status(&file).unwrap();

    assert_eq!(h.store.status(), before);
}

#[tokio::test]
async fn load_status_schedules_onto_idle_workers() {
    let h = harness();
    let job = long_job(&h);
    let view = StatusView {
        job_waitlist: vec![JobRequest::new(job.clone(), Default::default())],
        slaves: vec![Worker::new("10.0.0.1", Default::default())],
    };
    let file = h.dir.path().join("status.json");
    std::fs::write(&file, serde_json::to_string(&view).unwrap()).unwrap();

    h.store.load_status(&file).unwrap();

    let status = h.store.status();
    assert!(status.job_waitlist.is_empty());
    assert_eq!(status.slaves[0].status, WorkerStatus::Busy);
}

#[tokio::test]
async fn load_status_missing_file_is_an_error() {
    let h = harness();
    let err = h.store.load_status(&h.dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, StoreError::ReadStatus { .. }));
}

#[tokio::test]
async fn load_status_rejects_malformed_documents() {
    let h = harness();
    let file = h.dir.path().join("bad.json");
    std::fs::write(&file, "{not json").unwrap();
    let err = h.store.load_status(&file).unwrap_err();
    assert!(matches!(err, StoreError::ParseStatus { .. }));
}

#[tokio::test]
async fn busy_worker_without_a_job_is_normalized_on_load() {
    let h = harness();
    let file = h.dir.path().join("status.json");
    std::fs::write(
        &file,
        r#"{"job_waitlist": [], "slaves": [{"ip": "10.0.0.1", "envs": {}, "status": "busy", "running_job": null, "remove_after_finish": false}]}"#,
    )
    .unwrap();

    h.store.load_status(&file).unwrap();

    assert_eq!(h.store.status().slaves[0].status, WorkerStatus::Idle);
}
