// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the integration suite.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tempfile::TempDir;

use jh_core::FakeClock;
use jh_daemon::state::{Store, StorePaths};

static REPLY_SEQ: AtomicU64 = AtomicU64::new(0);

pub fn open_store(dir: &TempDir) -> Store<FakeClock> {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_700_000_000_000);
    open_store_with(dir, &clock)
}

pub fn open_store_with(dir: &TempDir, clock: &FakeClock) -> Store<FakeClock> {
    Store::open(
        StorePaths {
            snapshot: dir.path().join("server_context.pkl"),
            log_dir: dir.path().join("logs"),
        },
        clock.clone(),
    )
    .expect("store opens")
}

/// Write an executable shell script; returns its absolute path as argv[0].
pub fn script(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("script written");
    let mut perms = std::fs::metadata(&path).expect("script stat").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("script chmod");
    path.to_string_lossy().into_owned()
}

/// A job that blocks until `{dir}/{flag}` exists, so the test controls when
/// it "finishes".
pub fn gated_job(dir: &Path, flag: &str) -> Vec<String> {
    let body = format!("while [ ! -f {} ]; do sleep 0.05; done", dir.join(flag).display());
    vec![script(dir, &format!("gated_{}.sh", flag), &body)]
}

pub fn release_gate(dir: &Path, flag: &str) {
    std::fs::write(dir.join(flag), "").expect("gate released");
}

/// Poll until `predicate` holds or `deadline` passes.
pub async fn wait_for(predicate: impl Fn() -> bool, deadline: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    predicate()
}

/// Act as a one-shot CLI client against a live daemon's data dir.
pub async fn request(data_dir: &Path, mut record: serde_json::Value) -> serde_json::Value {
    let reply_path =
        data_dir.join(format!("tmp_{}", REPLY_SEQ.fetch_add(1, Ordering::Relaxed)));
    nix::unistd::mkfifo(&reply_path, nix::sys::stat::Mode::from_bits_truncate(0o600))
        .expect("reply fifo created");
    record["pipe"] = serde_json::Value::String(reply_path.to_string_lossy().into_owned());

    let fifo = data_dir.join("commands_fifo");
    let line = record.to_string();
    tokio::task::spawn_blocking(move || {
        use std::io::Write;
        let mut f = std::fs::OpenOptions::new().write(true).open(&fifo).expect("fifo opens");
        writeln!(f, "{}", line).expect("record written");
    })
    .await
    .expect("writer task");

    let reply_read = reply_path.clone();
    let text = tokio::task::spawn_blocking(move || std::fs::read_to_string(&reply_read))
        .await
        .expect("reader task")
        .expect("reply read");
    let _ = std::fs::remove_file(&reply_path);
    serde_json::from_str(text.trim()).expect("reply parses")
}

pub async fn wait_for_file(path: PathBuf) {
    assert!(
        wait_for(move || path.exists(), Duration::from_secs(5)).await,
        "file never appeared"
    );
}
