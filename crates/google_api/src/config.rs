use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::GoogleError;

pub const DEFAULT_GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const HEADER_API_KEY: &str = "x-goog-api-key";
pub const HEADER_CONTENT_TYPE: &str = "content-type";

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Sent as `x-goog-api-key`, never as a `key=` query parameter.
    pub api_key: String,
    pub base_url: String,
    pub timeout: Option<Duration>,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_GOOGLE_BASE_URL.to_string(),
            timeout: None,
        }
    }
}

impl GoogleConfig {
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

    pub fn headers(&self) -> Result<BTreeMap<String, String>, GoogleError> {
        let api_key = self.api_key.trim();
        if api_key.is_empty() {
            return Err(GoogleError::MissingApiKey);
        }

        Ok(BTreeMap::from([
            (HEADER_API_KEY.to_owned(), api_key.to_owned()),
            (HEADER_CONTENT_TYPE.to_owned(), "application/json".to_owned()),
        ]))
    }
}

/// `{base}/models/{model}:generateContent`, with a blank base falling back to the public API.
pub fn generate_content_url(base: &str, model: &str) -> String {
    let base = if base.trim().is_empty() {
        DEFAULT_GOOGLE_BASE_URL
    } else {
        base.trim()
    };
    let model = model.trim().trim_start_matches("models/");
    format!(
        "{}/models/{model}:generateContent",
        base.trim_end_matches('/')
    )
}
