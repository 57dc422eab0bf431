// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The whole daemon driven exactly like a CLI client drives it: FIFO in,
//! reply FIFO out, pid-file discipline, startup reclamation.

use std::time::Duration;

use jh_daemon::lifecycle::{self, Config, LifecycleError};
use serial_test::serial;

use super::support::*;

fn daemon_config(dir: &std::path::Path) -> Config {
    Config {
        data_dir: dir.join("data"),
        log_dir: dir.join("logs"),
    }
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn full_session_over_the_control_channel() {
    let dir = tempfile::tempdir().unwrap();
    let config = daemon_config(dir.path());
    let data_dir = config.data_dir.clone();

    // A leftover reply pipe from a "crashed client".
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::write(data_dir.join("tmp_42"), "").unwrap();

    let daemon = tokio::spawn(lifecycle::run(config));
    wait_for_file(data_dir.join("commands_fifo")).await;

    // Startup collected the stale reply pipe and recorded our pid.
    assert!(!data_dir.join("tmp_42").exists());
    let recorded: u32 = std::fs::read_to_string(data_dir.join("service_pid"))
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert_eq!(recorded, std::process::id());

    let reply = request(
        &data_dir,
        serde_json::json!({"type": "add_slave", "ip": "10.0.0.1", "envs": []}),
    )
    .await;
    assert_eq!(reply, serde_json::json!({"msg": "ok"}));

    let job = script(dir.path(), "job.sh", "sleep 5");
    let reply = request(
        &data_dir,
        serde_json::json!({"type": "add_job", "args": [job, "a"], "envs": ["K=v"]}),
    )
    .await;
    assert_eq!(reply, serde_json::json!({"msg": "Job is assigned to 10.0.0.1."}));

    let status = request(&data_dir, serde_json::json!({"type": "status"})).await;
    assert_eq!(status["slaves"][0]["status"], "busy");
    assert_eq!(status["slaves"][0]["running_job"]["args"][1], "a");
    assert_eq!(status["slaves"][0]["running_job"]["envs"]["K"], "v");

    // Round-trip the status document through load_status: a no-op.
    let status_file = dir.path().join("status.json");
    std::fs::write(&status_file, status.to_string()).unwrap();
    let reply = request(
        &data_dir,
        serde_json::json!({"type": "load_status", "file": status_file}),
    )
    .await;
    assert_eq!(reply, serde_json::json!({"msg": "ok"}));
    let after = request(&data_dir, serde_json::json!({"type": "status"})).await;
    assert_eq!(after, status);

    let reply = request(&data_dir, serde_json::json!({"type": "shutdown"})).await;
    assert_eq!(reply, serde_json::json!({"msg": "Stopped"}));
    daemon.await.unwrap().unwrap();

    // Clean shutdown removes the FIFO and pid file; the snapshot stays.
    assert!(!data_dir.join("commands_fifo").exists());
    assert!(!data_dir.join("service_pid").exists());
    assert!(data_dir.join("server_context.pkl").exists());
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn second_start_against_a_live_daemon_refuses() {
    let dir = tempfile::tempdir().unwrap();
    let config = daemon_config(dir.path());
    let data_dir = config.data_dir.clone();

    let daemon = tokio::spawn(lifecycle::run(config.clone()));
    wait_for_file(data_dir.join("commands_fifo")).await;

    match lifecycle::run(config).await {
        Err(LifecycleError::AlreadyRunning(pid)) => assert_eq!(pid, std::process::id()),
        other => panic!("expected AlreadyRunning, got {:?}", other.err()),
    }

    request(&data_dir, serde_json::json!({"type": "shutdown"})).await;
    daemon.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn daemon_survives_garbage_and_unknown_commands() {
    let dir = tempfile::tempdir().unwrap();
    let config = daemon_config(dir.path());
    let data_dir = config.data_dir.clone();

    let daemon = tokio::spawn(lifecycle::run(config));
    wait_for_file(data_dir.join("commands_fifo")).await;

    // Garbage record: logged and skipped.
    {
        use std::io::Write;
        let fifo = data_dir.join("commands_fifo");
        tokio::task::spawn_blocking(move || {
            let mut f = std::fs::OpenOptions::new().write(true).open(&fifo).unwrap();
            writeln!(f, "{{half a record").unwrap();
        })
        .await
        .unwrap();
    }

    let reply = request(&data_dir, serde_json::json!({"type": "make_coffee"})).await;
    assert_eq!(
        reply,
        serde_json::json!({"err": "Unknown command type make_coffee"})
    );

    // Still serving.
    let status = request(&data_dir, serde_json::json!({"type": "status"})).await;
    assert_eq!(status, serde_json::json!({"job_waitlist": [], "slaves": []}));

    request(&data_dir, serde_json::json!({"type": "shutdown"})).await;
    daemon.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn stale_pid_from_a_dead_process_is_reclaimed() {
    let dir = tempfile::tempdir().unwrap();
    let config = daemon_config(dir.path());
    let data_dir = config.data_dir.clone();

    // Simulate a crashed daemon: dead pid, leftover FIFO.
    std::fs::create_dir_all(&data_dir).unwrap();
    let mut child = std::process::Command::new("true").spawn().unwrap();
    let dead_pid = child.id();
    child.wait().unwrap();
    std::fs::write(data_dir.join("service_pid"), dead_pid.to_string()).unwrap();
    nix::unistd::mkfifo(
        &data_dir.join("commands_fifo"),
        nix::sys::stat::Mode::from_bits_truncate(0o644),
    )
    .unwrap();

    let daemon = tokio::spawn(lifecycle::run(config));

    // The stale FIFO is removed before our pid is recorded, so once the pid
    // file is ours, any FIFO we see is the fresh one.
    let took_over = wait_for(
        {
            let pid_path = data_dir.join("service_pid");
            move || {
                std::fs::read_to_string(&pid_path)
                    .map(|s| s.trim() == std::process::id().to_string())
                    .unwrap_or(false)
            }
        },
        Duration::from_secs(5),
    )
    .await;
    assert!(took_over, "daemon never reclaimed the stale pid file");
    wait_for_file(data_dir.join("commands_fifo")).await;

    let reply = request(&data_dir, serde_json::json!({"type": "shutdown"})).await;
    assert_eq!(reply, serde_json::json!({"msg": "Stopped"}));
    daemon.await.unwrap().unwrap();
}
