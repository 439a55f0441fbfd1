//! Gemini implementation of the shared `chat_provider` contract.
//!
//! `assistant` turns are sent with Gemini's `model` role and replies come back
//! as `assistant`, so saved documents never see the wire role.

use std::sync::Arc;
use std::time::Duration;

use chat_provider::{
    ChatProvider, ChatTurn, CompletionRequest, ProviderInitError, ProviderProfile,
};
use google_api::payload::{MODEL_ROLE, USER_ROLE};
use google_api::{Content, GenerateContentRequest, GoogleClient, GoogleConfig, GoogleError};

pub const GOOGLE_PROVIDER_ID: &str = "google";

pub const DEFAULT_GOOGLE_MODEL: &str = "gemini-2.5-flash-preview-05-20";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleProviderConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
}

impl GoogleProviderConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn into_google_config(self) -> GoogleConfig {
        let mut config = GoogleConfig::new(self.api_key);
        if let Some(base_url) = self.base_url {
            config = config.with_base_url(base_url);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        config
    }
}

trait GenerateClient: Send + Sync {
    fn generate(&self, model: &str, request: &GenerateContentRequest)
        -> Result<String, GoogleError>;
}

#[derive(Debug)]
struct DefaultGenerateClient {
    client: GoogleClient,
}

impl GenerateClient for DefaultGenerateClient {
    fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<String, GoogleError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                GoogleError::Unknown(format!("failed to initialize tokio runtime: {error}"))
            })?;

        runtime.block_on(self.client.generate_text(model, request))
    }
}

pub struct GoogleProvider {
    model: String,
    client: Arc<dyn GenerateClient>,
}

impl GoogleProvider {
    pub fn new(config: GoogleProviderConfig) -> Result<Self, ProviderInitError> {
        let model = sanitize_model(&config.model);
        let client = GoogleClient::new(config.into_google_config()).map_err(|error| {
            ProviderInitError::new(format!("Failed to initialize google provider: {error}"))
        })?;

        Ok(Self {
            model,
            client: Arc::new(DefaultGenerateClient { client }),
        })
    }

    fn build_request(req: CompletionRequest) -> Result<GenerateContentRequest, String> {
        let mut system = Vec::new();
        if !req.instructions.trim().is_empty() {
            system.push(req.instructions);
        }

        let mut contents = Vec::with_capacity(req.turns.len());
        for turn in req.turns {
            let role = match turn.role.as_str() {
                "system" => {
                    system.push(turn.content);
                    continue;
                }
                "user" => USER_ROLE,
                "assistant" => MODEL_ROLE,
                other => return Err(format!("Invalid role: {other}")),
            };
            contents.push(Content::new(role, turn.content));
        }

        let request = GenerateContentRequest::new(contents);
        Ok(if system.is_empty() {
            request
        } else {
            request.with_system_instruction(system.join("\n\n"))
        })
    }

    #[cfg(test)]
    fn with_client_for_tests(model: &str, client: Arc<dyn GenerateClient>) -> Self {
        Self {
            model: sanitize_model(model),
            client,
        }
    }
}

impl ChatProvider for GoogleProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: GOOGLE_PROVIDER_ID.to_string(),
            model_id: self.model.clone(),
        }
    }

    fn complete(&self, req: CompletionRequest) -> Result<ChatTurn, String> {
        let request = Self::build_request(req)?;
        tracing::debug!(
            model = %self.model,
            contents = request.contents.len(),
            "requesting content generation"
        );

        let text = self
            .client
            .generate(&self.model, &request)
            .map_err(|error| format!("Google request failed: {error}"))?;
        Ok(ChatTurn::new("assistant", text))
    }
}

fn sanitize_model(model: &str) -> String {
    let trimmed = model.trim();
    if trimmed.is_empty() {
        DEFAULT_GOOGLE_MODEL.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, MutexGuard};

    use super::*;

    fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        match mutex.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    struct FakeGenerateClient {
        observed: Mutex<Option<(String, GenerateContentRequest)>>,
        outcome: Mutex<Option<Result<String, GoogleError>>>,
    }

    impl FakeGenerateClient {
        fn with_outcome(outcome: Result<String, GoogleError>) -> Arc<Self> {
            Arc::new(Self {
                observed: Mutex::new(None),
                outcome: Mutex::new(Some(outcome)),
            })
        }

        fn observed(&self) -> Option<(String, GenerateContentRequest)> {
            lock_unpoisoned(&self.observed).clone()
        }
    }

    impl GenerateClient for FakeGenerateClient {
        fn generate(
            &self,
            model: &str,
            request: &GenerateContentRequest,
        ) -> Result<String, GoogleError> {
            *lock_unpoisoned(&self.observed) = Some((model.to_string(), request.clone()));
            match lock_unpoisoned(&self.outcome).take() {
                Some(outcome) => outcome,
                None => panic!("fake generate outcome should be consumed exactly once"),
            }
        }
    }

    fn provider(fake: &Arc<FakeGenerateClient>) -> GoogleProvider {
        GoogleProvider::with_client_for_tests(
            "gemini-2.5-flash",
            Arc::clone(fake) as Arc<dyn GenerateClient>,
        )
    }

    #[test]
    fn assistant_turns_use_model_role_and_reply_is_assistant() {
        let fake = FakeGenerateClient::with_outcome(Ok("Bonjour".to_string()));
        let reply = provider(&fake)
            .complete(CompletionRequest::new(
                vec![
                    ChatTurn::new("user", "Hi"),
                    ChatTurn::new("assistant", "Hey"),
                    ChatTurn::new("system", "Answer in French."),
                    ChatTurn::new("user", "Again"),
                ],
                "You are a helpful assistant.",
            ))
            .expect("completion should succeed");
        assert_eq!(reply, ChatTurn::new("assistant", "Bonjour"));

        let (model, request) = fake.observed().expect("request should reach transport");
        assert_eq!(model, "gemini-2.5-flash");
        let roles: Vec<Option<&str>> = request
            .contents
            .iter()
            .map(|content| content.role.as_deref())
            .collect();
        assert_eq!(roles, vec![Some("user"), Some("model"), Some("user")]);
        assert_eq!(
            request.system_instruction.map(|content| content.joined_text()),
            Some("You are a helpful assistant.\n\nAnswer in French.".to_string())
        );
    }

    #[test]
    fn unknown_role_is_rejected_before_transport() {
        let fake = FakeGenerateClient::with_outcome(Ok("unused".to_string()));
        let error = provider(&fake)
            .complete(CompletionRequest::new(vec![ChatTurn::new("tool", "{}")], ""))
            .expect_err("tool role should be rejected");
        assert_eq!(error, "Invalid role: tool");
        assert!(fake.observed().is_none());
    }

    #[test]
    fn transport_error_is_reported_with_context() {
        let fake = FakeGenerateClient::with_outcome(Err(GoogleError::EmptyResponse(Some(
            "finish reason: SAFETY".to_string(),
        ))));
        let error = provider(&fake)
            .complete(CompletionRequest::new(vec![ChatTurn::new("user", "Hi")], ""))
            .expect_err("transport failure should surface");
        assert!(error.starts_with("Google request failed:"));
        assert!(error.contains("SAFETY"));
    }

    #[test]
    fn blank_model_uses_default() {
        let fake = FakeGenerateClient::with_outcome(Ok("unused".to_string()));
        let provider = GoogleProvider::with_client_for_tests("", fake);
        assert_eq!(provider.profile().provider_id, GOOGLE_PROVIDER_ID);
        assert_eq!(provider.profile().model_id, DEFAULT_GOOGLE_MODEL);
    }
}
