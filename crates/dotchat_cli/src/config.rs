//! Settings resolution: flags, then environment, then the JSON config file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dotchat::DEFAULT_EXTENSION;
use serde::Deserialize;
use session_store::{default_history_file, default_session_dir};
use thiserror::Error;
use time::Date;

use crate::cli::{Cli, ServiceName, DEFAULT_SUMMARY_PROMPT, DEFAULT_SYSTEM_PROMPT};
use crate::error::UsageError;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-7-sonnet-latest";
pub const DEFAULT_ANTHROPIC_MAX_TOKENS: u32 = 16384;
pub const DEFAULT_GOOGLE_MODEL: &str = "gemini-2.5-flash-preview-05-20";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config file {path}: timeout_sec must be > 0")]
    InvalidTimeout { path: PathBuf },

    #[error("invalid config file {path}: anthropic_max_tokens must be > 0")]
    InvalidMaxTokens { path: PathBuf },
}

/// Optional JSON settings file. Every field is optional; unknown fields are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub system_prompt: Option<String>,
    pub summary_prompt: Option<String>,
    pub service_name: Option<ServiceName>,
    pub openai_model: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_organization: Option<String>,
    pub anthropic_model: Option<String>,
    pub anthropic_max_tokens: Option<u32>,
    pub anthropic_base_url: Option<String>,
    pub google_model: Option<String>,
    pub google_base_url: Option<String>,
    pub timeout_sec: Option<u64>,
    pub session_file_location: Option<PathBuf>,
    pub session_history_file: Option<PathBuf>,
    pub session_file_ext: Option<String>,
    pub reverse: Option<bool>,
    pub no_pager: Option<bool>,
    pub no_rich: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(path, &text)
    }

    fn from_json(path: &Path, text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if config.timeout_sec == Some(0) {
            return Err(ConfigError::InvalidTimeout {
                path: path.to_path_buf(),
            });
        }
        if config.anthropic_max_tokens == Some(0) {
            return Err(ConfigError::InvalidMaxTokens {
                path: path.to_path_buf(),
            });
        }
        Ok(config)
    }
}

/// `DOTCHAT_*` environment overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub service_name: Option<String>,
    pub openai_model: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_organization: Option<String>,
    pub anthropic_model: Option<String>,
    pub anthropic_base_url: Option<String>,
    pub google_model: Option<String>,
    pub google_base_url: Option<String>,
    pub no_pager: bool,
    pub no_rich: bool,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            config_path: env_string_opt(&lookup, "DOTCHAT_CONFIG").map(PathBuf::from),
            service_name: env_string_opt(&lookup, "DOTCHAT_SERVICE_NAME"),
            openai_model: env_string_opt(&lookup, "DOTCHAT_OPENAI_MODEL"),
            openai_base_url: env_string_opt(&lookup, "DOTCHAT_OPENAI_BASE_URL"),
            openai_organization: env_string_opt(&lookup, "DOTCHAT_OPENAI_ORGANIZATION"),
            anthropic_model: env_string_opt(&lookup, "DOTCHAT_ANTHROPIC_MODEL"),
            anthropic_base_url: env_string_opt(&lookup, "DOTCHAT_ANTHROPIC_BASE_URL"),
            google_model: env_string_opt(&lookup, "DOTCHAT_GOOGLE_MODEL"),
            google_base_url: env_string_opt(&lookup, "DOTCHAT_GOOGLE_BASE_URL"),
            no_pager: env_flag(&lookup, "DOTCHAT_NO_PAGER"),
            no_rich: env_flag(&lookup, "DOTCHAT_NO_RICH"),
        }
    }
}

/// `--config`, else `DOTCHAT_CONFIG`.
pub fn config_file_path(cli: &Cli, env: &EnvConfig) -> Option<PathBuf> {
    cli.config.clone().or_else(|| env.config_path.clone())
}

fn env_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> bool {
    lookup(key).map(|value| value == "1").unwrap_or(false)
}

fn env_string_opt(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

/// How the save prompt is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assume {
    Prompt,
    Yes,
    No,
}

/// Checks flag and terminal combinations before any work starts.
pub fn validate_invocation(
    assume_yes: bool,
    assume_no: bool,
    stdin_is_terminal: bool,
    stdout_is_terminal: bool,
) -> Result<Assume, UsageError> {
    let assume = match (assume_yes, assume_no) {
        (true, true) => return Err(UsageError::ConflictingAssume),
        (true, false) => Assume::Yes,
        (false, true) => Assume::No,
        (false, false) => Assume::Prompt,
    };
    if stdin_is_terminal && !stdout_is_terminal {
        return Err(UsageError::StdoutNotTerminal);
    }
    if !stdin_is_terminal && assume == Assume::Prompt {
        return Err(UsageError::MissingAssumeForPipe);
    }
    Ok(assume)
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub system_prompt: String,
    pub summary_prompt: String,
    pub service: ServiceName,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub openai_organization: Option<String>,
    pub anthropic_model: String,
    pub anthropic_max_tokens: u32,
    pub anthropic_base_url: Option<String>,
    pub google_model: String,
    pub google_base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub reverse: bool,
    pub no_pager: bool,
    /// Print replies as raw text even on a terminal.
    pub no_rich: bool,
    pub current_directory: bool,
    pub session_dir: PathBuf,
    pub history_file: PathBuf,
    pub extension: String,
}

impl Settings {
    pub fn resolve(
        cli: &Cli,
        file: FileConfig,
        env: &EnvConfig,
        app_dir: &Path,
        today: Date,
    ) -> Result<Self, UnknownService> {
        let env_service = env
            .service_name
            .as_deref()
            .map(parse_service_name)
            .transpose()?;
        let service = cli
            .service_name
            .or(env_service)
            .or(file.service_name)
            .unwrap_or(ServiceName::OpenAi);

        let extension = cli
            .session_file_ext
            .clone()
            .or(file.session_file_ext)
            .map(|ext| normalize_extension(&ext))
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

        Ok(Self {
            system_prompt: cli
                .system_prompt
                .clone()
                .or(file.system_prompt)
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            summary_prompt: cli
                .summary_prompt
                .clone()
                .or(file.summary_prompt)
                .unwrap_or_else(|| DEFAULT_SUMMARY_PROMPT.to_string()),
            service,
            openai_model: cli
                .openai_model
                .clone()
                .or_else(|| env.openai_model.clone())
                .or(file.openai_model)
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            openai_base_url: env.openai_base_url.clone().or(file.openai_base_url),
            openai_organization: env
                .openai_organization
                .clone()
                .or(file.openai_organization),
            anthropic_model: cli
                .anthropic_model
                .clone()
                .or_else(|| env.anthropic_model.clone())
                .or(file.anthropic_model)
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
            anthropic_max_tokens: cli
                .anthropic_max_tokens
                .or(file.anthropic_max_tokens)
                .unwrap_or(DEFAULT_ANTHROPIC_MAX_TOKENS),
            anthropic_base_url: env.anthropic_base_url.clone().or(file.anthropic_base_url),
            google_model: cli
                .google_model
                .clone()
                .or_else(|| env.google_model.clone())
                .or(file.google_model)
                .unwrap_or_else(|| DEFAULT_GOOGLE_MODEL.to_string()),
            google_base_url: env.google_base_url.clone().or(file.google_base_url),
            timeout: file.timeout_sec.map(Duration::from_secs),
            reverse: cli.reverse || file.reverse.unwrap_or(false),
            no_pager: cli.no_pager || env.no_pager || file.no_pager.unwrap_or(false),
            no_rich: cli.no_rich || env.no_rich || file.no_rich.unwrap_or(false),
            current_directory: cli.current_directory,
            session_dir: cli
                .session_file_location
                .clone()
                .or(file.session_file_location)
                .unwrap_or_else(|| default_session_dir(app_dir, today)),
            history_file: cli
                .session_history_file
                .clone()
                .or(file.session_history_file)
                .unwrap_or_else(|| default_history_file(app_dir)),
            extension,
        })
    }
}

#[derive(Debug, Error)]
#[error("Invalid service name: {0}")]
pub struct UnknownService(pub String);

fn parse_service_name(value: &str) -> Result<ServiceName, UnknownService> {
    match value.trim().to_ascii_lowercase().as_str() {
        "openai" => Ok(ServiceName::OpenAi),
        "anthropic" => Ok(ServiceName::Anthropic),
        "google" => Ok(ServiceName::Google),
        "mock" => Ok(ServiceName::Mock),
        _ => Err(UnknownService(value.to_string())),
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim();
    if ext.is_empty() || ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}
