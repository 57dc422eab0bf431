// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

use jh_core::FakeClock;
use std::os::unix::fs::PermissionsExt;
use std::time::Duration;
use tempfile::TempDir;

mod jobs;
mod recovery;
mod slaves;

pub(super) struct Harness {
    pub dir: TempDir,
    pub store: Store<FakeClock>,
    pub clock: FakeClock,
}

pub(super) fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_700_000_000_000);
    let store = open_at(&dir, &clock);
    Harness { dir, store, clock }
}

pub(super) fn open_at(dir: &TempDir, clock: &FakeClock) -> Store<FakeClock> {
    Store::open(
        StorePaths {
            snapshot: dir.path().join("server_context.pkl"),
            log_dir: dir.path().join("logs"),
        },
        clock.clone(),
    )
    .unwrap()
}

/// Write an executable script and return its absolute path as argv[0].
pub(super) fn script(h: &Harness, name: &str, body: &str) -> String {
    let path = h.dir.path().join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path.to_string_lossy().into_owned()
}

/// A job that stays alive for the duration of a test.
pub(super) fn long_job(h: &Harness) -> Vec<String> {
    vec![script(h, "long.sh", "sleep 5")]
}

pub(super) fn no_envs() -> Vec<String> {
    Vec::new()
}

/// Poll until `predicate` holds or the deadline passes.
pub(super) async fn wait_for(predicate: impl Fn() -> bool, deadline: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    predicate()
}
