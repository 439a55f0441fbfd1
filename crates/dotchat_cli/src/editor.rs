//! External editor round trip for the conversation buffer.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use dotchat::decode_document;

pub const DEFAULT_EDITOR: &str = "vi";

/// `$VISUAL`, then `$EDITOR`, then `vi`. Blank values are skipped.
pub fn resolve_editor_command(lookup: impl Fn(&str) -> Option<String>) -> String {
    lookup("VISUAL")
        .filter(|value| !value.trim().is_empty())
        .or_else(|| lookup("EDITOR").filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_EDITOR.to_owned())
}

/// Editor command with a cursor hint for vi-family editors.
///
/// The new user section sits on line 2 in reverse mode and at the end otherwise.
pub fn editor_invocation(editor: &str, reverse: bool) -> String {
    let program = editor
        .split_whitespace()
        .next()
        .and_then(|word| Path::new(word).file_name())
        .and_then(|name| name.to_str())
        .unwrap_or_default();

    match program {
        "vi" | "vim" | "nvim" if reverse => format!("{editor} +2"),
        "vi" | "vim" | "nvim" => format!("{editor} +"),
        _ => editor.to_owned(),
    }
}

/// Writes `buffer` to a temp file named `*{extension}`, runs the editor on it and
/// returns the saved contents.
pub fn edit_text(command: &str, buffer: &str, extension: &str) -> Result<String> {
    let mut file = tempfile::Builder::new()
        .prefix("dotchat-")
        .suffix(extension)
        .tempfile()
        .context("creating editor buffer file")?;
    file.write_all(buffer.as_bytes())
        .and_then(|()| file.flush())
        .context("writing editor buffer file")?;

    launch_editor_command(command, file.path())?;

    let bytes = fs::read(file.path()).context("reading editor buffer file")?;
    Ok(decode_document(bytes, "editor")?)
}

fn launch_editor_command(command: &str, path: &Path) -> Result<()> {
    let path_text = path.to_string_lossy();
    if path_text.starts_with('-') {
        bail!("invalid editor temp path");
    }

    tracing::debug!(command, path = %path.display(), "launching editor");
    let status = Command::new("sh")
        .arg("-lc")
        .arg(format!("{command} {}", shell_single_quote(path_text.as_ref())))
        .status()
        .with_context(|| format!("failed to run editor command `{command}`"))?;
    if !status.success() {
        bail!("editor command failed with status {status}");
    }
    Ok(())
}

pub(crate) fn shell_single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}
