// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subcommand implementations.

pub mod daemon;
pub mod job;
pub mod slave;

use jh_daemon::protocol::Response;

/// Print a server reply the way the legacy CLI did: `{msg}` on stdout,
/// `{err}` on stderr (the exit code stays 0 — nonzero is reserved for
/// client-side pre-checks), status documents pretty-printed.
pub(crate) fn render(response: Response) -> anyhow::Result<()> {
    match response {
        Response::Message { msg } => println!("{}", msg),
        Response::Error { err } => eprintln!("Error: {}", err),
        Response::Status(view) => println!("{}", serde_json::to_string_pretty(&view)?),
    }
    Ok(())
}
