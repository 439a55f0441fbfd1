use openai_api::error::parse_error_message;
use openai_api::retry::{is_retryable_http_error, next_retry_delay, MAX_RETRIES};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};

use crate::config::{normalize_messages_url, AnthropicConfig};
use crate::error::AnthropicError;
use crate::payload::{MessagesRequest, MessagesResponse};

#[derive(Debug)]
pub struct AnthropicClient {
    http: Client,
    config: AnthropicConfig,
}

impl AnthropicClient {
    pub fn new(config: AnthropicConfig) -> Result<Self, AnthropicError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(AnthropicError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &AnthropicConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_messages_url(&self.config.base_url)
    }

    fn build_headers(&self) -> Result<HeaderMap, AnthropicError> {
        let mut out = HeaderMap::new();
        for (key, value) in self.config.headers()? {
            out.insert(
                HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
                    AnthropicError::InvalidHeader(format!("invalid header key: {key}"))
                })?,
                HeaderValue::from_str(&value).map_err(|_| {
                    AnthropicError::InvalidHeader(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        request: &MessagesRequest,
    ) -> Result<reqwest::RequestBuilder, AnthropicError> {
        validate_request(request)?;

        Ok(self
            .http
            .post(self.normalized_endpoint())
            .headers(self.build_headers()?)
            .json(request))
    }

    pub async fn send_with_retry(
        &self,
        request: &MessagesRequest,
    ) -> Result<Response, AnthropicError> {
        let mut last_status: Option<StatusCode> = None;
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            match self.build_request(request)?.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    last_status = Some(status);
                    let retry_after = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|value| value.to_str().ok())
                        .map(str::to_owned);
                    let body = response.text().await.unwrap_or_default();
                    let message = parse_error_message(status, &body);
                    last_error = Some(message.clone());

                    if attempt < MAX_RETRIES && is_retryable_http_error(status.as_u16(), &body) {
                        let delay = next_retry_delay(attempt, retry_after.as_deref());
                        tracing::warn!(
                            status = status.as_u16(),
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "retrying messages request"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    return Err(AnthropicError::Status(status, message));
                }
                Err(error) => {
                    let message = error.to_string();
                    last_error = Some(message.clone());
                    if attempt < MAX_RETRIES {
                        let delay = next_retry_delay(attempt, None);
                        tracing::warn!(
                            error = %message,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "messages transport error; retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                }
            }
        }

        Err(AnthropicError::RetryExhausted {
            status: last_status,
            last_error,
        })
    }

    pub async fn complete(
        &self,
        request: &MessagesRequest,
    ) -> Result<MessagesResponse, AnthropicError> {
        let response = self.send_with_retry(request).await?;
        let body = response.text().await?;
        let parsed = serde_json::from_str::<MessagesResponse>(&body)?;
        if let Some(usage) = parsed.usage {
            tracing::debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                stop_reason = parsed.stop_reason.as_deref().unwrap_or("none"),
                "messages usage"
            );
        }
        Ok(parsed)
    }

    /// Reply role and joined text; blank text is [`AnthropicError::EmptyResponse`].
    pub async fn complete_text(
        &self,
        request: &MessagesRequest,
    ) -> Result<(String, String), AnthropicError> {
        nonempty_text(self.complete(request).await?)
    }
}

pub(crate) fn nonempty_text(response: MessagesResponse) -> Result<(String, String), AnthropicError> {
    let text = response.text();
    if text.trim().is_empty() {
        return Err(AnthropicError::EmptyResponse);
    }
    Ok((response.role, text))
}

fn validate_request(request: &MessagesRequest) -> Result<(), AnthropicError> {
    if request.model.trim().is_empty() {
        return Err(AnthropicError::InvalidRequestPayload(
            "'model' must not be empty".to_owned(),
        ));
    }
    if request.max_tokens == 0 {
        return Err(AnthropicError::InvalidRequestPayload(
            "'max_tokens' must be at least 1".to_owned(),
        ));
    }
    if request.messages.is_empty() {
        return Err(AnthropicError::InvalidRequestPayload(
            "'messages' must contain at least one message".to_owned(),
        ));
    }
    Ok(())
}
