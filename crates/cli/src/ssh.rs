// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reachability probe for worker registration.

use anyhow::{bail, Context, Result};
use tokio::process::Command;

/// Verify passwordless SSH works for `ip` before registering it.
pub async fn probe(ip: &str) -> Result<()> {
    let status = Command::new("ssh")
        .args(["-o", "PasswordAuthentication=no", "-o", "BatchMode=yes", ip, "/bin/true"])
        .status()
        .await
        .context("could not run ssh")?;
    if !status.success() {
        bail!(
            "Password login is still required for ssh {ip}. \
             Set up passwordless SSH or pass --skip_ssh_auth_check."
        );
    }
    Ok(())
}
