use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};

use crate::config::OpenAiConfig;
use crate::error::{parse_error_message, OpenAiError};
use crate::headers::build_headers;
use crate::payload::{ChatCompletionRequest, ChatCompletionResponse, ResponseMessage};
use crate::retry::{is_retryable_http_error, next_retry_delay, MAX_RETRIES};
use crate::url::normalize_chat_url;

#[derive(Debug)]
pub struct OpenAiClient {
    http: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, OpenAiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(OpenAiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    pub fn normalized_endpoint(&self) -> String {
        normalize_chat_url(&self.config.base_url)
    }

    pub fn build_headers(&self) -> Result<HeaderMap, OpenAiError> {
        let headers = build_headers(&self.config)?;
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| OpenAiError::InvalidHeader(format!("invalid header key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    OpenAiError::InvalidHeader(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<reqwest::RequestBuilder, OpenAiError> {
        validate_request(request)?;

        let headers = self.build_headers()?;
        Ok(self
            .http
            .post(self.normalized_endpoint())
            .headers(headers)
            .json(request))
    }

    pub async fn send_with_retry(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<Response, OpenAiError> {
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
                    let body = response.text().await.unwrap_or_else(|_| {
                        status
                            .canonical_reason()
                            .unwrap_or("request failed")
                            .to_string()
                    });
                    let message = parse_error_message(status, &body);
                    last_error = Some(message.clone());

                    if attempt < MAX_RETRIES && is_retryable_http_error(status.as_u16(), &body) {
                        let delay = next_retry_delay(attempt, retry_after.as_deref());
                        tracing::warn!(
                            status = status.as_u16(),
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "retrying chat completion request"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    return Err(OpenAiError::Status(status, message));
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
                            "chat completion transport error; retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(OpenAiError::RetryExhausted {
                        status: last_status,
                        last_error,
                    });
                }
            }
        }

        Err(OpenAiError::RetryExhausted {
            status: last_status,
            last_error,
        })
    }

    /// Sends the request and decodes the full response body.
    pub async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, OpenAiError> {
        let response = self.send_with_retry(request).await?;
        let body = response.text().await?;
        let parsed = serde_json::from_str::<ChatCompletionResponse>(&body)?;
        if let Some(usage) = parsed.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion usage"
            );
        }
        Ok(parsed)
    }

    /// Returns the first choice's message, rejecting missing or blank content.
    pub async fn complete_message(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ResponseMessage, OpenAiError> {
        let response = self.complete(request).await?;
        first_nonempty_message(response)
    }
}

pub(crate) fn first_nonempty_message(
    response: ChatCompletionResponse,
) -> Result<ResponseMessage, OpenAiError> {
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or(OpenAiError::EmptyResponse)?;
    match message.content.as_deref() {
        Some(content) if !content.trim().is_empty() => Ok(message),
        _ => Err(OpenAiError::EmptyResponse),
    }
}

fn validate_request(request: &ChatCompletionRequest) -> Result<(), OpenAiError> {
    if request.model.trim().is_empty() {
        return Err(OpenAiError::InvalidRequestPayload(
            "'model' must not be empty".to_owned(),
        ));
    }
    if request.messages.is_empty() {
        return Err(OpenAiError::InvalidRequestPayload(
            "'messages' must contain at least one message".to_owned(),
        ));
    }
    Ok(())
}
