use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde::Deserialize;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

pub const DEFAULT_SUMMARY_PROMPT: &str = "Given the conversation so far, summarize it in just 4 words. Only respond with these 4 words";

/// `FILENAME` value that resumes the most recent session in the history ledger.
pub const PREVIOUS_SESSION_ARG: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceName {
    #[value(name = "openai", alias = "OpenAI")]
    #[serde(alias = "OpenAI")]
    OpenAi,
    #[value(alias = "Anthropic")]
    #[serde(alias = "Anthropic")]
    Anthropic,
    #[value(alias = "Google")]
    #[serde(alias = "Google")]
    Google,
    Mock,
}

impl ServiceName {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::Mock => "mock",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Google => "Google",
            Self::Mock => "Mock",
        }
    }

    #[must_use]
    pub fn requires_api_key(self) -> bool {
        !matches!(self, Self::Mock)
    }
}

/// Chat with a language model through plain-text conversation documents.
#[derive(Parser, Debug, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
#[command(name = "dotchat", version, about, long_about = None)]
#[command(after_help = "Examples:
  dotchat                         Start a new session in $EDITOR
  dotchat notes.dcb               Resume a saved session
  dotchat -                       Resume the previous session
  echo 'Hi' | dotchat -y          Ask once from a pipe and save
  dotchat -H                      List saved sessions
")]
pub struct Cli {
    /// Session file to resume; `-` resumes the previous session
    #[arg(value_name = "FILENAME")]
    pub filename: Option<String>,

    /// System prompt sent ahead of the conversation
    #[arg(short = 'p', long)]
    pub system_prompt: Option<String>,

    /// Print the reply without a pager
    #[arg(long)]
    pub no_pager: bool,

    /// Print the reply as raw text instead of rendered markdown
    #[arg(long)]
    pub no_rich: bool,

    /// Edit the conversation newest-first
    #[arg(short = 'r', long)]
    pub reverse: bool,

    /// Answer yes to every prompt and run non-interactively
    #[arg(short = 'y', long)]
    pub assume_yes: bool,

    /// Answer no to every prompt and run non-interactively
    #[arg(short = 'n', long)]
    pub assume_no: bool,

    /// Save new sessions in the current directory
    #[arg(short = 'c', long)]
    pub current_directory: bool,

    /// File listing saved sessions, most recent last
    #[arg(long, value_name = "PATH")]
    pub session_history_file: Option<PathBuf>,

    /// Directory for new session files
    #[arg(long, value_name = "DIR")]
    pub session_file_location: Option<PathBuf>,

    /// Extension for session files
    #[arg(long, value_name = "EXT")]
    pub session_file_ext: Option<String>,

    /// Prompt used to summarize the conversation into a filename
    #[arg(long)]
    pub summary_prompt: Option<String>,

    /// Chat service
    #[arg(short = 's', long, value_enum)]
    pub service_name: Option<ServiceName>,

    /// OpenAI model id
    #[arg(long, value_name = "MODEL", help_heading = "OpenAI options")]
    pub openai_model: Option<String>,

    /// Anthropic model id
    #[arg(long, value_name = "MODEL", help_heading = "Anthropic options")]
    pub anthropic_model: Option<String>,

    /// Upper bound on tokens in an Anthropic reply
    #[arg(
        long,
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(1..),
        help_heading = "Anthropic options"
    )]
    pub anthropic_max_tokens: Option<u32>,

    /// Gemini model id
    #[arg(long, value_name = "MODEL", help_heading = "Google options")]
    pub google_model: Option<String>,

    /// Print saved sessions with their modification times
    #[arg(short = 'H', long)]
    pub history: bool,

    /// JSON settings file [env: DOTCHAT_CONFIG]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
