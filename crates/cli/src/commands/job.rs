// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `add_job` / `remove_job`.

use anyhow::{bail, Result};
use std::path::Path;

use jh_daemon::protocol::Command;

use super::render;
use crate::client::Client;
use crate::JobArgs;

pub async fn add(data_dir: &Path, args: JobArgs) -> Result<()> {
    let client = Client::new(data_dir)?;
    if !Path::new(&args.script).is_file() {
        bail!("{} does not exist", args.script);
    }
    render(
        client
            .request(Command::AddJob { args: argv(args.script, args.args), envs: args.env })
            .await?,
    )
}

pub async fn remove(data_dir: &Path, args: JobArgs) -> Result<()> {
    let client = Client::new(data_dir)?;
    render(
        client
            .request(Command::RemoveJob { args: argv(args.script, args.args), envs: args.env })
            .await?,
    )
}

fn argv(script: String, rest: Vec<String>) -> Vec<String> {
    let mut argv = vec![dot_slash(script)];
    argv.extend(rest);
    argv
}

/// Relative scripts are submitted `./`-prefixed so workers run them from
/// their job directory; absolute paths pass through.
fn dot_slash(script: String) -> String {
    if script.starts_with("./") || script.starts_with('/') {
        script
    } else {
        format!("./{}", script)
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
