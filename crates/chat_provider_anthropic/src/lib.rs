//! Anthropic Messages implementation of the shared `chat_provider` contract.
//!
//! `system` turns found in the conversation are folded into the request's
//! top-level system text after the instructions, since the Messages API only
//! accepts `user` and `assistant` inside `messages`.

use std::sync::Arc;
use std::time::Duration;

use anthropic_api::{
    AnthropicClient, AnthropicConfig, AnthropicError, MessageParam, MessageRole, MessagesRequest,
};
use chat_provider::{
    ChatProvider, ChatTurn, CompletionRequest, ProviderInitError, ProviderProfile,
};

pub const ANTHROPIC_PROVIDER_ID: &str = "anthropic";

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-7-sonnet-latest";

pub const DEFAULT_ANTHROPIC_MAX_TOKENS: u32 = 16384;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnthropicProviderConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
}

impl AnthropicProviderConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: DEFAULT_ANTHROPIC_MAX_TOKENS,
            base_url: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
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

    fn into_anthropic_config(self) -> AnthropicConfig {
        let mut config = AnthropicConfig::new(self.api_key);
        if let Some(base_url) = self.base_url {
            config = config.with_base_url(base_url);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        config
    }
}

trait MessagesClient: Send + Sync {
    fn complete(&self, request: &MessagesRequest) -> Result<(String, String), AnthropicError>;
}

#[derive(Debug)]
struct DefaultMessagesClient {
    client: AnthropicClient,
}

impl MessagesClient for DefaultMessagesClient {
    fn complete(&self, request: &MessagesRequest) -> Result<(String, String), AnthropicError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                AnthropicError::Unknown(format!("failed to initialize tokio runtime: {error}"))
            })?;

        runtime.block_on(self.client.complete_text(request))
    }
}

pub struct AnthropicProvider {
    model: String,
    max_tokens: u32,
    client: Arc<dyn MessagesClient>,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> Result<Self, ProviderInitError> {
        if config.max_tokens == 0 {
            return Err(ProviderInitError::new(
                "Failed to initialize anthropic provider: max tokens must be at least 1",
            ));
        }
        let model = sanitize_model(&config.model);
        let max_tokens = config.max_tokens;
        let client = AnthropicClient::new(config.into_anthropic_config()).map_err(|error| {
            ProviderInitError::new(format!("Failed to initialize anthropic provider: {error}"))
        })?;

        Ok(Self {
            model,
            max_tokens,
            client: Arc::new(DefaultMessagesClient { client }),
        })
    }

    fn build_request(&self, req: CompletionRequest) -> Result<MessagesRequest, String> {
        let mut system = Vec::new();
        if !req.instructions.trim().is_empty() {
            system.push(req.instructions);
        }

        let mut messages = Vec::with_capacity(req.turns.len());
        for turn in req.turns {
            if turn.role == "system" {
                system.push(turn.content);
                continue;
            }
            let role = MessageRole::parse(&turn.role)
                .map_err(|_| format!("Invalid role: {}", turn.role))?;
            messages.push(MessageParam::new(role, turn.content));
        }

        let request = MessagesRequest::new(self.model.clone(), self.max_tokens, messages);
        Ok(if system.is_empty() {
            request
        } else {
            request.with_system(system.join("\n\n"))
        })
    }

    #[cfg(test)]
    fn with_client_for_tests(model: &str, client: Arc<dyn MessagesClient>) -> Self {
        Self {
            model: sanitize_model(model),
            max_tokens: DEFAULT_ANTHROPIC_MAX_TOKENS,
            client,
        }
    }
}

impl ChatProvider for AnthropicProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: ANTHROPIC_PROVIDER_ID.to_string(),
            model_id: self.model.clone(),
        }
    }

    fn complete(&self, req: CompletionRequest) -> Result<ChatTurn, String> {
        let request = self.build_request(req)?;
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            max_tokens = request.max_tokens,
            "requesting message"
        );

        let (role, text) = self
            .client
            .complete(&request)
            .map_err(|error| format!("Anthropic request failed: {error}"))?;
        Ok(ChatTurn::new(role, text))
    }
}

fn sanitize_model(model: &str) -> String {
    let trimmed = model.trim();
    if trimmed.is_empty() {
        DEFAULT_ANTHROPIC_MODEL.to_string()
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

    struct FakeMessagesClient {
        observed: Mutex<Option<MessagesRequest>>,
        outcome: Mutex<Option<Result<(String, String), AnthropicError>>>,
    }

    impl FakeMessagesClient {
        fn with_outcome(outcome: Result<(String, String), AnthropicError>) -> Arc<Self> {
            Arc::new(Self {
                observed: Mutex::new(None),
                outcome: Mutex::new(Some(outcome)),
            })
        }

        fn replying(text: &str) -> Arc<Self> {
            Self::with_outcome(Ok(("assistant".to_string(), text.to_string())))
        }

        fn observed(&self) -> Option<MessagesRequest> {
            lock_unpoisoned(&self.observed).clone()
        }
    }

    impl MessagesClient for FakeMessagesClient {
        fn complete(&self, request: &MessagesRequest) -> Result<(String, String), AnthropicError> {
            *lock_unpoisoned(&self.observed) = Some(request.clone());
            match lock_unpoisoned(&self.outcome).take() {
                Some(outcome) => outcome,
                None => panic!("fake messages outcome should be consumed exactly once"),
            }
        }
    }

    fn provider(fake: &Arc<FakeMessagesClient>) -> AnthropicProvider {
        AnthropicProvider::with_client_for_tests(
            "claude-3-7-sonnet-latest",
            Arc::clone(fake) as Arc<dyn MessagesClient>,
        )
    }

    #[test]
    fn instructions_go_to_system_and_turns_keep_order() {
        let fake = FakeMessagesClient::replying("Hello!");
        let reply = provider(&fake)
            .complete(CompletionRequest::new(
                vec![
                    ChatTurn::new("user", "Hi"),
                    ChatTurn::new("assistant", "Hey"),
                    ChatTurn::new("user", "Again"),
                ],
                "You are a helpful assistant.",
            ))
            .expect("completion should succeed");
        assert_eq!(reply, ChatTurn::new("assistant", "Hello!"));

        let observed = fake.observed().expect("request should reach transport");
        assert_eq!(observed.model, "claude-3-7-sonnet-latest");
        assert_eq!(observed.max_tokens, DEFAULT_ANTHROPIC_MAX_TOKENS);
        assert_eq!(observed.system.as_deref(), Some("You are a helpful assistant."));
        let roles: Vec<MessageRole> = observed.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::User, MessageRole::Assistant, MessageRole::User]
        );
    }

    #[test]
    fn system_turns_are_folded_into_system_text() {
        let fake = FakeMessagesClient::replying("ok");
        provider(&fake)
            .complete(CompletionRequest::new(
                vec![
                    ChatTurn::new("system", "Answer in French."),
                    ChatTurn::new("user", "Hi"),
                ],
                "Be brief.",
            ))
            .expect("completion should succeed");

        let observed = fake.observed().expect("request should reach transport");
        assert_eq!(
            observed.system.as_deref(),
            Some("Be brief.\n\nAnswer in French.")
        );
        assert_eq!(observed.messages.len(), 1);
    }

    #[test]
    fn blank_instructions_send_no_system_text() {
        let fake = FakeMessagesClient::replying("ok");
        provider(&fake)
            .complete(CompletionRequest::new(vec![ChatTurn::new("user", "Hi")], "  "))
            .expect("completion should succeed");
        assert_eq!(fake.observed().expect("observed").system, None);
    }

    #[test]
    fn unknown_role_is_rejected_before_transport() {
        let fake = FakeMessagesClient::replying("unused");
        let error = provider(&fake)
            .complete(CompletionRequest::new(
                vec![ChatTurn::new("narrator", "Once"), ChatTurn::new("user", "Hi")],
                "",
            ))
            .expect_err("narrator role should be rejected");
        assert_eq!(error, "Invalid role: narrator");
        assert!(fake.observed().is_none());
    }

    #[test]
    fn transport_error_is_reported_with_context() {
        let fake = FakeMessagesClient::with_outcome(Err(AnthropicError::EmptyResponse));
        let error = provider(&fake)
            .complete(CompletionRequest::new(vec![ChatTurn::new("user", "Hi")], ""))
            .expect_err("transport failure should surface");
        assert!(error.starts_with("Anthropic request failed:"));
        assert!(error.contains("empty response"));
    }

    #[test]
    fn zero_max_tokens_fails_construction() {
        let config = AnthropicProviderConfig::new("sk-ant", "").with_max_tokens(0);
        assert!(AnthropicProvider::new(config).is_err());
    }

    #[test]
    fn blank_model_uses_default() {
        let fake = FakeMessagesClient::replying("unused");
        let provider = AnthropicProvider::with_client_for_tests(" ", fake);
        assert_eq!(provider.profile().provider_id, ANTHROPIC_PROVIDER_ID);
        assert_eq!(provider.profile().model_id, DEFAULT_ANTHROPIC_MODEL);
    }
}
