use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::AnthropicError;

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Value sent in the `anthropic-version` header.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

pub const HEADER_API_KEY: &str = "x-api-key";
pub const HEADER_VERSION: &str = "anthropic-version";
pub const HEADER_CONTENT_TYPE: &str = "content-type";

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    /// Normalized to the `messages` endpoint by [`normalize_messages_url`].
    pub base_url: String,
    pub timeout: Option<Duration>,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            timeout: None,
        }
    }
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Lowercase header map; fails when the key is blank.
    pub fn headers(&self) -> Result<BTreeMap<String, String>, AnthropicError> {
        let api_key = self.api_key.trim();
        if api_key.is_empty() {
            return Err(AnthropicError::MissingApiKey);
        }

        Ok(BTreeMap::from([
            (HEADER_API_KEY.to_owned(), api_key.to_owned()),
            (HEADER_VERSION.to_owned(), ANTHROPIC_VERSION.to_owned()),
            (HEADER_CONTENT_TYPE.to_owned(), "application/json".to_owned()),
        ]))
    }
}

/// `…/messages` is kept, a `/v1` base gets `/messages`, anything else `/v1/messages`.
pub fn normalize_messages_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_ANTHROPIC_BASE_URL
    } else {
        input.trim()
    };

    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with("/messages") {
        return trimmed.to_string();
    }
    if trimmed.ends_with("/v1") {
        return format!("{trimmed}/messages");
    }
    format!("{trimmed}/v1/messages")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_url_normalization() {
        assert_eq!(
            normalize_messages_url(""),
            "https://api.anthropic.com/v1/messages"
        );
        assert_eq!(
            normalize_messages_url("http://127.0.0.1:8080/v1/"),
            "http://127.0.0.1:8080/v1/messages"
        );
        assert_eq!(
            normalize_messages_url("https://proxy.example/anthropic"),
            "https://proxy.example/anthropic/v1/messages"
        );
        assert_eq!(
            normalize_messages_url("https://proxy.example/v1/messages"),
            "https://proxy.example/v1/messages"
        );
    }

    #[test]
    fn headers_carry_key_and_version() {
        let headers = AnthropicConfig::new(" sk-ant ").headers().expect("headers");
        assert_eq!(headers[HEADER_API_KEY], "sk-ant");
        assert_eq!(headers[HEADER_VERSION], ANTHROPIC_VERSION);
        assert!(!headers.contains_key("authorization"));
    }

    #[test]
    fn blank_key_is_rejected() {
        assert!(matches!(
            AnthropicConfig::new("  ").headers(),
            Err(AnthropicError::MissingApiKey)
        ));
    }
}
