use openai_api::retry::{is_retryable_http_error, next_retry_delay, MAX_RETRIES};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};

use crate::config::{generate_content_url, GoogleConfig};
use crate::error::{parse_error_message, GoogleError};
use crate::payload::{GenerateContentRequest, GenerateContentResponse};

#[derive(Debug)]
pub struct GoogleClient {
    http: Client,
    config: GoogleConfig,
}

impl GoogleClient {
    pub fn new(config: GoogleConfig) -> Result<Self, GoogleError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(GoogleError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    fn build_headers(&self) -> Result<HeaderMap, GoogleError> {
        let mut out = HeaderMap::new();
        for (key, value) in self.config.headers()? {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| GoogleError::InvalidHeader(format!("invalid header key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    GoogleError::InvalidHeader(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<reqwest::RequestBuilder, GoogleError> {
        if model.trim().is_empty() {
            return Err(GoogleError::InvalidRequestPayload(
                "model must not be empty".to_owned(),
            ));
        }
        if request.contents.is_empty() {
            return Err(GoogleError::InvalidRequestPayload(
                "'contents' must contain at least one entry".to_owned(),
            ));
        }

        Ok(self
            .http
            .post(generate_content_url(&self.config.base_url, model))
            .headers(self.build_headers()?)
            .json(request))
    }

    pub async fn send_with_retry(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<Response, GoogleError> {
        let mut last_status: Option<StatusCode> = None;
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            match self.build_request(model, request)?.send().await {
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
                            "retrying generateContent request"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    return Err(GoogleError::Status(status, message));
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
                            "generateContent transport error; retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                }
            }
        }

        Err(GoogleError::RetryExhausted {
            status: last_status,
            last_error,
        })
    }

    pub async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GoogleError> {
        let response = self.send_with_retry(model, request).await?;
        let body = response.text().await?;
        let parsed = serde_json::from_str::<GenerateContentResponse>(&body)?;
        if let Some(usage) = parsed.usage_metadata {
            tracing::debug!(
                prompt_tokens = usage.prompt_token_count,
                candidate_tokens = usage.candidates_token_count,
                "generateContent usage"
            );
        }
        Ok(parsed)
    }

    /// Text of the first candidate; blank text is [`GoogleError::EmptyResponse`].
    pub async fn generate_text(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<String, GoogleError> {
        nonempty_text(self.generate(model, request).await?)
    }
}

pub(crate) fn nonempty_text(response: GenerateContentResponse) -> Result<String, GoogleError> {
    match response.first_text() {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(GoogleError::EmptyResponse(response.stop_explanation())),
    }
}
