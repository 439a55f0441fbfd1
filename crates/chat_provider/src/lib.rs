//! Minimal provider-agnostic contract for one chat completion.
//!
//! This crate defines only the request/reply shapes shared by the CLI and its
//! providers. It excludes transport details, credentials, and document formats.

use std::fmt;

/// Error returned while constructing/configuring a provider before any request is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInitError {
    message: String,
}

impl ProviderInitError {
    /// Creates a new provider initialization error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderInitError {}

impl From<String> for ProviderInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ProviderInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Provider-neutral conversation turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    #[must_use]
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Input required to request one completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Conversation in turn order; the last turn is the one being answered.
    pub turns: Vec<ChatTurn>,
    /// System instructions the provider places ahead of `turns`.
    pub instructions: String,
}

impl CompletionRequest {
    #[must_use]
    pub fn new(turns: Vec<ChatTurn>, instructions: impl Into<String>) -> Self {
        Self {
            turns,
            instructions: instructions.into(),
        }
    }

    /// Same instructions, with one more turn appended.
    #[must_use]
    pub fn with_turn(mut self, turn: ChatTurn) -> Self {
        self.turns.push(turn);
        self
    }
}

/// Immutable metadata describing a chat provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub model_id: String,
}

/// Provider interface for answering one completion request.
///
/// Calls are synchronous from the caller perspective; retries, if any, happen inside
/// the provider.
pub trait ChatProvider: Send + Sync + 'static {
    /// Returns provider/model identity metadata.
    fn profile(&self) -> ProviderProfile;

    /// Produces exactly one reply turn for the request.
    fn complete(&self, req: CompletionRequest) -> Result<ChatTurn, String>;
}
