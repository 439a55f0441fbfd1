//! Transport-only client for the Gemini `generateContent` endpoint.
//!
//! Shares the retry policy of `openai_api`; error bodies carry a numeric
//! `code` and are parsed here.

pub mod client;
pub mod config;
pub mod error;
pub mod payload;

pub use client::GoogleClient;
pub use config::{generate_content_url, GoogleConfig};
pub use error::{parse_error_message, GoogleError};
pub use payload::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part};
