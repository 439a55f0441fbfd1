//! Conversation turn model.

/// Role assigned to implicit headerless documents and expected on the turn awaiting a reply.
pub const USER_ROLE: &str = "user";
pub const ASSISTANT_ROLE: &str = "assistant";
pub const SYSTEM_ROLE: &str = "system";

/// One conversational turn.
///
/// Roles are open strings: the document format accepts any ASCII-letter token and
/// passes it through verbatim. Callers that need the conventional
/// `system`/`user`/`assistant` triple validate at their own boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message {
    role: String,
    content: String,
}

/// Ordered conversation; index order is turn order.
pub type Messages = Vec<Message>;

impl Message {
    #[must_use]
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(USER_ROLE, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ASSISTANT_ROLE, content)
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(SYSTEM_ROLE, content)
    }

    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == USER_ROLE
    }

    /// Returns true when the body holds nothing but whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Splits the message into `(role, content)`.
    #[must_use]
    pub fn into_parts(self) -> (String, String) {
        (self.role, self.content)
    }
}
