// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `start` / `stop` / `status` / `load_status`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use jh_daemon::lifecycle::{self, Config};
use jh_daemon::protocol::Command;

use super::render;
use crate::client::Client;

/// Host the daemon loop in the foreground until `stop` is sent.
pub async fn start(data_dir: PathBuf, log_dir: PathBuf) -> Result<()> {
    lifecycle::run(Config { data_dir, log_dir }).await.map_err(Into::into)
}

pub async fn stop(data_dir: &Path) -> Result<()> {
    let client = Client::new(data_dir)?;
    render(client.request(Command::Shutdown).await?)
}

pub async fn status(data_dir: &Path) -> Result<()> {
    let client = Client::new(data_dir)?;
    render(client.request(Command::Status).await?)
}

pub async fn load_status(data_dir: &Path, file: PathBuf) -> Result<()> {
    let client = Client::new(data_dir)?;
    // The daemon resolves paths against its own working directory, so ship
    // an absolute one.
    let file = std::fs::canonicalize(&file)
        .with_context(|| format!("{} does not exist", file.display()))?;
    render(client.request(Command::LoadStatus { file }).await?)
}
