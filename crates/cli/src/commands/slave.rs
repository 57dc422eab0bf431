// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `add_slave` / `remove_slave`.

use anyhow::Result;
use std::path::Path;

use jh_daemon::protocol::{Command, RemoveOptions};

use super::render;
use crate::client::Client;
use crate::ssh;

pub async fn add(
    data_dir: &Path,
    ips: Vec<String>,
    env: Vec<String>,
    skip_ssh_auth_check: bool,
) -> Result<()> {
    let client = Client::new(data_dir)?;
    for ip in ips {
        if !skip_ssh_auth_check {
            ssh::probe(&ip).await?;
        }
        render(client.request(Command::AddSlave { ip, envs: env.clone() }).await?)?;
    }
    Ok(())
}

pub async fn remove(data_dir: &Path, ips: Vec<String>, wait: bool, kill: bool) -> Result<()> {
    let client = Client::new(data_dir)?;
    let options = RemoveOptions { wait, kill };
    for ip in ips {
        render(client.request(Command::RemoveSlave { ip, options }).await?)?;
    }
    Ok(())
}
