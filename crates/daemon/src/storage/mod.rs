// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable state for jobherd

mod snapshot;

pub use snapshot::{load, save, Snapshot, SnapshotError, CURRENT_SNAPSHOT_VERSION};
