//! Transport-only OpenAI Chat Completions client primitives.
//!
//! This crate owns request building, retry, and response/error parsing for the
//! `chat/completions` endpoint only. It contains no credential lookup and no
//! knowledge of conversation documents.

pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod payload;
pub mod retry;
pub mod url;

pub use client::OpenAiClient;
pub use config::OpenAiConfig;
pub use error::OpenAiError;
pub use payload::{
    ChatCompletionChoice, ChatCompletionMessage, ChatCompletionRequest, ChatCompletionResponse,
    ChatRole, ResponseMessage, Usage,
};
pub use url::normalize_chat_url;
