//! Transport-only client for the Anthropic Messages API.
//!
//! Retry policy and error-body parsing come from `openai_api`; both services
//! report failures in the same `{"error": {"message": ...}}` envelope.

pub mod client;
pub mod config;
pub mod error;
pub mod payload;

pub use client::AnthropicClient;
pub use config::{normalize_messages_url, AnthropicConfig, ANTHROPIC_VERSION};
pub use error::AnthropicError;
pub use payload::{MessageParam, MessageRole, MessagesRequest, MessagesResponse, ResponseBlock};
