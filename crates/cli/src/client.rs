// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot request/response client for the daemon's control channel.
//!
//! Each request creates a private reply FIFO, writes one command record to
//! the daemon's command FIFO, blocks for the single reply line, and cleans
//! up after itself.

use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

use jh_core::{Clock, SystemClock};
use jh_daemon::lifecycle::REPLY_PREFIX;
use jh_daemon::listener::COMMANDS_FIFO;
use jh_daemon::protocol::{Command, CommandRecord, Response};

pub struct Client {
    data_dir: PathBuf,
    fifo: PathBuf,
}

impl Client {
    /// Connect to the daemon behind `data_dir`. Fails fast when no daemon
    /// has created the command FIFO.
    pub fn new(data_dir: &Path) -> Result<Self> {
        let fifo = data_dir.join(COMMANDS_FIFO);
        if !fifo.exists() {
            bail!(
                "{} does not exist. Start the server with `jobherd start`.",
                fifo.display()
            );
        }
        Ok(Self { data_dir: data_dir.to_path_buf(), fifo })
    }

    /// Send one command and wait for its reply.
    pub async fn request(&self, command: Command) -> Result<Response> {
        let reply_path = self
            .data_dir
            .join(format!("{}{}", REPLY_PREFIX, SystemClock.epoch_ms()));
        if reply_path.exists() {
            std::fs::remove_file(&reply_path)?;
        }
        nix::unistd::mkfifo(&reply_path, nix::sys::stat::Mode::from_bits_truncate(0o600))
            .with_context(|| format!("cannot create reply pipe {}", reply_path.display()))?;

        let record = CommandRecord::with_pipe(command, reply_path.clone());
        let line = serde_json::to_string(&record)?;

        // Both FIFO ends are blocking opens; keep them off the async threads.
        let fifo = self.fifo.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut f = std::fs::OpenOptions::new().write(true).open(&fifo)?;
            writeln!(f, "{}", line)
        })
        .await?
        .context("cannot write to the command pipe")?;

        let reply_read = reply_path.clone();
        let text = tokio::task::spawn_blocking(move || std::fs::read_to_string(&reply_read))
            .await?
            .context("cannot read the reply pipe")?;
        let _ = std::fs::remove_file(&reply_path);

        serde_json::from_str(text.trim()).context("invalid response from server")
    }
}
