//! Terminal side effects used by the run loop.
//!
//! [`ProcessConsole`] talks to the real process streams, editor and pager; tests
//! substitute a scripted implementation.

use std::io::{self, BufRead, IsTerminal, Read, Write};

use anyhow::{Context, Result};
use dotchat::decode_document;

use crate::editor::{edit_text, editor_invocation};
use crate::output::page;

/// Answer to "Save conversation?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveChoice {
    Yes,
    No,
    /// Save, then take another turn.
    Continue,
}

impl SaveChoice {
    /// Empty input takes the default (`Yes`); anything unrecognized is `None`.
    #[must_use]
    pub fn parse_answer(answer: &str) -> Option<Self> {
        match answer.trim().to_ascii_lowercase().as_str() {
            "" | "y" | "yes" => Some(Self::Yes),
            "n" | "no" => Some(Self::No),
            "c" | "continue" => Some(Self::Continue),
            _ => None,
        }
    }
}

pub const SAVE_PROMPT: &str = "Save conversation? [Y/n/c] ";

pub trait Console {
    fn stdin_is_terminal(&self) -> bool;

    fn stdout_is_terminal(&self) -> bool;

    /// Reads all of stdin as document text.
    fn read_stdin(&mut self) -> Result<String>;

    /// Opens `buffer` in the editor and returns the saved text.
    fn edit(&mut self, buffer: &str, extension: &str, reverse: bool) -> Result<String>;

    /// Writes the reply to stdout, through the pager when `use_pager` is set.
    fn show_reply(&mut self, text: &str, use_pager: bool) -> Result<()>;

    /// Status line on stderr.
    fn notice(&mut self, message: &str);

    fn ask_save(&mut self) -> Result<SaveChoice>;

    /// Reads one line after printing `prompt` on stderr.
    fn prompt_line(&mut self, prompt: &str) -> Result<String>;

    /// Plain stdout output.
    fn print(&mut self, text: &str) -> Result<()>;
}

/// Console backed by the process's standard streams.
#[derive(Debug, Clone)]
pub struct ProcessConsole {
    editor: String,
    pager: String,
}

impl ProcessConsole {
    #[must_use]
    pub fn new(editor: impl Into<String>, pager: impl Into<String>) -> Self {
        Self {
            editor: editor.into(),
            pager: pager.into(),
        }
    }
}

impl Console for ProcessConsole {
    fn stdin_is_terminal(&self) -> bool {
        io::stdin().is_terminal()
    }

    fn stdout_is_terminal(&self) -> bool {
        io::stdout().is_terminal()
    }

    fn read_stdin(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        io::stdin()
            .lock()
            .read_to_end(&mut bytes)
            .context("reading stdin")?;
        Ok(decode_document(bytes, "stdin")?)
    }

    fn edit(&mut self, buffer: &str, extension: &str, reverse: bool) -> Result<String> {
        edit_text(&editor_invocation(&self.editor, reverse), buffer, extension)
    }

    fn show_reply(&mut self, text: &str, use_pager: bool) -> Result<()> {
        if use_pager {
            return page(&self.pager, text);
        }
        let mut stdout = io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        if !text.ends_with('\n') {
            stdout.write_all(b"\n")?;
        }
        stdout.flush()?;
        Ok(())
    }

    fn notice(&mut self, message: &str) {
        eprintln!("{message}");
    }

    fn ask_save(&mut self) -> Result<SaveChoice> {
        loop {
            let answer = self.prompt_line(SAVE_PROMPT)?;
            // EOF before an answer means the user walked away.
            if answer.is_empty() {
                return Ok(SaveChoice::No);
            }
            if let Some(choice) = SaveChoice::parse_answer(&answer) {
                return Ok(choice);
            }
            eprintln!("Please answer y, n or c.");
        }
    }

    fn prompt_line(&mut self, prompt: &str) -> Result<String> {
        let mut stderr = io::stderr().lock();
        stderr.write_all(prompt.as_bytes())?;
        stderr.flush()?;

        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("reading answer from stdin")?;
        Ok(line)
    }

    fn print(&mut self, text: &str) -> Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_answer_defaults_to_yes() {
        assert_eq!(SaveChoice::parse_answer("\n"), Some(SaveChoice::Yes));
        assert_eq!(SaveChoice::parse_answer(""), Some(SaveChoice::Yes));
    }

    #[test]
    fn answers_are_case_insensitive() {
        assert_eq!(SaveChoice::parse_answer("YES\n"), Some(SaveChoice::Yes));
        assert_eq!(SaveChoice::parse_answer(" N "), Some(SaveChoice::No));
        assert_eq!(SaveChoice::parse_answer("Continue"), Some(SaveChoice::Continue));
        assert_eq!(SaveChoice::parse_answer("c"), Some(SaveChoice::Continue));
    }

    #[test]
    fn unknown_answer_is_rejected() {
        assert_eq!(SaveChoice::parse_answer("maybe"), None);
    }
}
