//! Deterministic mock implementation of the shared `chat_provider` contract.
//!
//! This crate contains no transport/protocol logic and is intended for local
//! development and contract-level integration testing.

use std::sync::{Mutex, MutexGuard};

use chat_provider::{ChatProvider, ChatTurn, CompletionRequest, ProviderProfile};

/// Stable provider identifier used for explicit startup selection.
pub const MOCK_PROVIDER_ID: &str = "mock";

#[derive(Debug, Default)]
struct ScriptState {
    next_reply: usize,
    requests: Vec<CompletionRequest>,
}

/// Deterministic mock provider used by `dotchat_cli` tests and offline runs.
///
/// Replies are returned in script order; once the script is exhausted the last
/// reply repeats. Every request is recorded for later inspection.
#[derive(Debug)]
pub struct MockProvider {
    replies: Vec<String>,
    failure: Option<String>,
    state: Mutex<ScriptState>,
}

impl MockProvider {
    /// Creates a mock provider answering with `replies` in order.
    #[must_use]
    pub fn new(replies: Vec<String>) -> Self {
        Self {
            replies: sanitize_replies(replies),
            failure: None,
            state: Mutex::new(ScriptState::default()),
        }
    }

    /// Creates a mock provider whose every request fails with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(Vec::new())
        }
    }

    /// Requests observed so far, in call order.
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock_unpoisoned(&self.state).requests.clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(vec![
            "This is a mocked reply.\n\nIt is deterministic so sessions can be exercised offline."
                .to_string(),
            "Mocked Conversation Summary Title".to_string(),
        ])
    }
}

impl ChatProvider for MockProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            model_id: "mock".to_string(),
        }
    }

    fn complete(&self, req: CompletionRequest) -> Result<ChatTurn, String> {
        let mut state = lock_unpoisoned(&self.state);
        state.requests.push(req);

        if let Some(message) = &self.failure {
            return Err(message.clone());
        }

        let index = state.next_reply.min(self.replies.len() - 1);
        state.next_reply += 1;
        Ok(ChatTurn::new("assistant", self.replies[index].clone()))
    }
}

fn sanitize_replies(replies: Vec<String>) -> Vec<String> {
    let mut sanitized: Vec<String> = replies
        .into_iter()
        .filter(|reply| !reply.trim().is_empty())
        .collect();

    if sanitized.is_empty() {
        sanitized.push("mock reply".to_string());
    }

    sanitized
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
