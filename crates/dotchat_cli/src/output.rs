//! Reply display through `$PAGER`.

use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};

pub const DEFAULT_PAGER: &str = "less -R";

/// `$PAGER` when set and non-blank, else `less -R`.
pub fn resolve_pager_command(lookup: impl Fn(&str) -> Option<String>) -> String {
    lookup("PAGER")
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PAGER.to_owned())
}

/// Pipes `text` into the pager and waits for it to exit.
///
/// A pager that quits before reading everything is not an error.
pub fn page(command: &str, text: &str) -> Result<()> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to run pager `{command}`"))?;

    if let Some(mut stdin) = child.stdin.take() {
        match stdin.write_all(text.as_bytes()) {
            Ok(()) => {}
            Err(error) if error.kind() == ErrorKind::BrokenPipe => {}
            Err(error) => return Err(error).context("writing reply to pager"),
        }
    }

    let status = child.wait().context("waiting for pager")?;
    if !status.success() {
        bail!("pager `{command}` exited with status {status}");
    }
    Ok(())
}
