//! OpenAI Chat Completions implementation of the shared `chat_provider` contract.
//!
//! The adapter owns the blocking bridge: each `complete` call drives the async
//! transport on a private current-thread runtime.

use std::sync::Arc;
use std::time::Duration;

use chat_provider::{
    ChatProvider, ChatTurn, CompletionRequest, ProviderInitError, ProviderProfile,
};
use openai_api::{
    ChatCompletionMessage, ChatCompletionRequest, ChatRole, OpenAiClient, OpenAiConfig,
    OpenAiError, ResponseMessage,
};

/// Stable provider identifier used by CLI service selection.
pub const OPENAI_PROVIDER_ID: &str = "openai";

/// Model used when the configured model id is blank.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// Runtime configuration for the OpenAI provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiProviderConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub organization: Option<String>,
    pub timeout: Option<Duration>,
}

impl OpenAiProviderConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            organization: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn into_openai_config(self) -> OpenAiConfig {
        let mut config = OpenAiConfig::new(self.api_key);

        if let Some(base_url) = self.base_url {
            config = config.with_base_url(base_url);
        }

        if let Some(organization) = self.organization {
            config = config.with_organization(organization);
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        config
    }
}

trait CompletionClient: Send + Sync {
    fn complete(&self, request: &ChatCompletionRequest) -> Result<ResponseMessage, OpenAiError>;
}

#[derive(Debug)]
struct DefaultCompletionClient {
    client: OpenAiClient,
}

impl CompletionClient for DefaultCompletionClient {
    fn complete(&self, request: &ChatCompletionRequest) -> Result<ResponseMessage, OpenAiError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                OpenAiError::Unknown(format!("failed to initialize tokio runtime: {error}"))
            })?;

        runtime.block_on(self.client.complete_message(request))
    }
}

/// `ChatProvider` adapter backed by `openai_api` transport primitives.
pub struct OpenAiProvider {
    model: String,
    client: Arc<dyn CompletionClient>,
}

impl OpenAiProvider {
    /// Creates a provider using real OpenAI transport.
    pub fn new(config: OpenAiProviderConfig) -> Result<Self, ProviderInitError> {
        let model = sanitize_model(&config.model);
        let client = Arc::new(DefaultCompletionClient {
            client: OpenAiClient::new(config.into_openai_config()).map_err(map_init_error)?,
        });

        Ok(Self { model, client })
    }

    fn build_request(&self, req: CompletionRequest) -> Result<ChatCompletionRequest, String> {
        let mut messages = Vec::with_capacity(req.turns.len() + 1);
        if !req.instructions.trim().is_empty() {
            messages.push(ChatCompletionMessage::new(ChatRole::System, req.instructions));
        }
        for turn in req.turns {
            let role = ChatRole::parse(&turn.role)
                .map_err(|_| format!("Invalid role: {}", turn.role))?;
            messages.push(ChatCompletionMessage::new(role, turn.content));
        }

        Ok(ChatCompletionRequest::new(self.model.clone(), messages))
    }

    #[cfg(test)]
    fn with_client_for_tests(model: &str, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            model: sanitize_model(model),
            client,
        }
    }
}

impl ChatProvider for OpenAiProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: OPENAI_PROVIDER_ID.to_string(),
            model_id: self.model.clone(),
        }
    }

    fn complete(&self, req: CompletionRequest) -> Result<ChatTurn, String> {
        let request = self.build_request(req)?;
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "requesting chat completion"
        );

        let reply = self
            .client
            .complete(&request)
            .map_err(|error| format!("OpenAI request failed: {error}"))?;
        let content = reply.content.unwrap_or_default();
        Ok(ChatTurn::new(reply.role, content))
    }
}

fn sanitize_model(model: &str) -> String {
    let trimmed = model.trim();
    if trimmed.is_empty() {
        DEFAULT_OPENAI_MODEL.to_string()
    } else {
        trimmed.to_string()
    }
}

fn map_init_error(error: OpenAiError) -> ProviderInitError {
    ProviderInitError::new(format!("Failed to initialize openai provider: {error}"))
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

    struct FakeCompletionClient {
        observed: Mutex<Option<ChatCompletionRequest>>,
        outcome: Mutex<Option<Result<ResponseMessage, OpenAiError>>>,
    }

    impl FakeCompletionClient {
        fn replying(content: &str) -> Arc<Self> {
            Arc::new(Self {
                observed: Mutex::new(None),
                outcome: Mutex::new(Some(Ok(ResponseMessage {
                    role: "assistant".to_string(),
                    content: Some(content.to_string()),
                }))),
            })
        }

        fn failing(error: OpenAiError) -> Arc<Self> {
            Arc::new(Self {
                observed: Mutex::new(None),
                outcome: Mutex::new(Some(Err(error))),
            })
        }

        fn observed(&self) -> Option<ChatCompletionRequest> {
            lock_unpoisoned(&self.observed).clone()
        }
    }

    impl CompletionClient for FakeCompletionClient {
        fn complete(
            &self,
            request: &ChatCompletionRequest,
        ) -> Result<ResponseMessage, OpenAiError> {
            *lock_unpoisoned(&self.observed) = Some(request.clone());
            match lock_unpoisoned(&self.outcome).take() {
                Some(outcome) => outcome,
                None => panic!("fake completion outcome should be consumed exactly once"),
            }
        }
    }

    fn request(turns: &[(&str, &str)]) -> CompletionRequest {
        CompletionRequest::new(
            turns
                .iter()
                .map(|(role, content)| ChatTurn::new(*role, *content))
                .collect(),
            "You are a helpful assistant.",
        )
    }

    #[test]
    fn profile_reports_openai_provider_id_and_model() {
        let fake = FakeCompletionClient::replying("unused");
        let provider = OpenAiProvider::with_client_for_tests("gpt-4o-mini", fake);

        let profile = provider.profile();
        assert_eq!(profile.provider_id, OPENAI_PROVIDER_ID);
        assert_eq!(profile.model_id, "gpt-4o-mini");
    }

    #[test]
    fn blank_model_defaults_to_gpt_4o() {
        let fake = FakeCompletionClient::replying("unused");
        let provider = OpenAiProvider::with_client_for_tests("  ", fake);
        assert_eq!(provider.profile().model_id, DEFAULT_OPENAI_MODEL);
    }

    #[test]
    fn complete_prepends_instructions_and_maps_roles() {
        let fake = FakeCompletionClient::replying("Hello!");
        let provider = OpenAiProvider::with_client_for_tests(
            "gpt-4o",
            Arc::clone(&fake) as Arc<dyn CompletionClient>,
        );

        let reply = provider
            .complete(request(&[
                ("user", "Hi"),
                ("assistant", "Hey"),
                ("user", "Again"),
            ]))
            .expect("completion should succeed");
        assert_eq!(reply, ChatTurn::new("assistant", "Hello!"));

        let observed = fake.observed().expect("request should reach transport");
        assert_eq!(observed.model, "gpt-4o");
        let roles: Vec<ChatRole> = observed.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                ChatRole::System,
                ChatRole::User,
                ChatRole::Assistant,
                ChatRole::User
            ]
        );
        assert_eq!(observed.messages[0].content, "You are a helpful assistant.");
        assert_eq!(observed.messages[3].content, "Again");
    }

    #[test]
    fn blank_instructions_are_not_sent() {
        let fake = FakeCompletionClient::replying("ok");
        let provider = OpenAiProvider::with_client_for_tests(
            "gpt-4o",
            Arc::clone(&fake) as Arc<dyn CompletionClient>,
        );

        provider
            .complete(CompletionRequest::new(vec![ChatTurn::new("user", "Hi")], " "))
            .expect("completion should succeed");
        let observed = fake.observed().expect("request should reach transport");
        assert_eq!(observed.messages.len(), 1);
        assert_eq!(observed.messages[0].role, ChatRole::User);
    }

    #[test]
    fn unknown_role_is_rejected_before_transport() {
        let fake = FakeCompletionClient::replying("unused");
        let provider = OpenAiProvider::with_client_for_tests(
            "gpt-4o",
            Arc::clone(&fake) as Arc<dyn CompletionClient>,
        );

        let error = provider
            .complete(request(&[("narrator", "Once upon a time"), ("user", "Hi")]))
            .expect_err("narrator role should be rejected");
        assert_eq!(error, "Invalid role: narrator");
        assert!(fake.observed().is_none());
    }

    #[test]
    fn transport_error_is_reported_with_context() {
        let fake = FakeCompletionClient::failing(OpenAiError::EmptyResponse);
        let provider = OpenAiProvider::with_client_for_tests("gpt-4o", fake);

        let error = provider
            .complete(request(&[("user", "Hi")]))
            .expect_err("transport failure should surface");
        assert!(error.starts_with("OpenAI request failed:"));
        assert!(error.contains("empty response"));
    }
}
