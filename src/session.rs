//! One invocation's conversation lifecycle.
//!
//! ```text
//! Empty ──load──▶ Loaded ──edit/input──▶ Edited ──admit──▶ AwaitingReply
//!                   ▲                                            │
//!                   └──next_cycle── Saved ◀──mark_saved── Replied ◀┘ record_reply
//! ```
//!
//! `admit` is the only gate in front of a reply request: it fails unless the last
//! message is a non-blank `user` turn.

use std::fmt;

use crate::document::{parse, render, HEADER_DELIMITER, NEW_USER_TEMPLATE};
use crate::error::{EmptyTurnError, SessionError};
use crate::message::{Message, Messages, USER_ROLE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Loaded,
    Edited,
    AwaitingReply,
    Replied,
    Saved,
}

impl SessionState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Loaded => "loaded",
            Self::Edited => "edited",
            Self::AwaitingReply => "awaiting a reply",
            Self::Replied => "replied",
            Self::Saved => "saved",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    messages: Messages,
    state: SessionState,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Session with no stored conversation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            state: SessionState::Empty,
        }
    }

    /// Parses stored session text. A parse failure means the stored file is corrupted.
    pub fn load(text: &str) -> Result<Self, SessionError> {
        let messages = parse(text).map_err(SessionError::CorruptedSession)?;
        tracing::debug!(messages = messages.len(), "loaded stored session");
        Ok(Self::from_messages(messages))
    }

    #[must_use]
    pub fn from_messages(messages: Messages) -> Self {
        Self {
            messages,
            state: SessionState::Loaded,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn into_messages(self) -> Messages {
        self.messages
    }

    /// Text handed to the editor: the conversation plus an empty user section.
    ///
    /// In reverse mode the conversation is rendered newest-first and the empty user
    /// section sits at the top.
    #[must_use]
    pub fn editor_buffer(&self, reverse: bool) -> String {
        if reverse {
            let reversed: Messages = self.messages.iter().rev().cloned().collect();
            format!("{NEW_USER_TEMPLATE}{}", render(&reversed))
        } else {
            format!("{}{NEW_USER_TEMPLATE}", render(&self.messages))
        }
    }

    /// Replaces the conversation with the edited buffer.
    ///
    /// The buffer is the full conversation as produced by [`Session::editor_buffer`];
    /// in reverse mode it is parsed newest-first and flipped back.
    pub fn apply_edit(&mut self, text: &str, reverse: bool) -> Result<(), SessionError> {
        self.ensure_editable("apply an edit")?;
        let mut messages = parse(text).map_err(SessionError::MalformedEdit)?;
        if reverse {
            messages.reverse();
        }
        tracing::debug!(messages = messages.len(), reverse, "applied editor buffer");
        self.messages = messages;
        self.state = SessionState::Edited;
        Ok(())
    }

    /// Appends messages parsed from non-interactive input to the loaded conversation.
    pub fn append_input(&mut self, text: &str) -> Result<(), SessionError> {
        self.ensure_editable("append input")?;
        let messages = parse(text).map_err(SessionError::MalformedEdit)?;
        tracing::debug!(appended = messages.len(), "appended piped input");
        self.messages.extend(messages);
        self.state = SessionState::Edited;
        Ok(())
    }

    /// Admission gate: the conversation must end in a non-blank user turn.
    pub fn admit(&mut self) -> Result<&[Message], SessionError> {
        if self.state != SessionState::Edited {
            return Err(self.invalid("request a reply"));
        }
        check_admission(&self.messages)?;
        self.state = SessionState::AwaitingReply;
        Ok(&self.messages)
    }

    /// Appends the single reply produced for the admitted conversation.
    pub fn record_reply(&mut self, reply: Message) -> Result<(), SessionError> {
        if self.state != SessionState::AwaitingReply {
            return Err(self.invalid("record a reply"));
        }
        if let Some(line) = header_line_in(reply.content()) {
            return Err(SessionError::HeaderInReply { line });
        }
        self.messages.push(reply);
        self.state = SessionState::Replied;
        Ok(())
    }

    /// Latest reply, if one has been recorded this cycle.
    #[must_use]
    pub fn reply(&self) -> Option<&Message> {
        match self.state {
            SessionState::Replied | SessionState::Saved => self.messages.last(),
            _ => None,
        }
    }

    /// Canonical document text for the whole conversation.
    #[must_use]
    pub fn render(&self) -> String {
        render(&self.messages)
    }

    pub fn mark_saved(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Replied {
            return Err(self.invalid("save"));
        }
        self.state = SessionState::Saved;
        Ok(())
    }

    /// Starts another request cycle on the same conversation.
    pub fn next_cycle(&mut self) -> Result<(), SessionError> {
        if !matches!(self.state, SessionState::Replied | SessionState::Saved) {
            return Err(self.invalid("start another cycle"));
        }
        self.state = SessionState::Loaded;
        Ok(())
    }

    fn ensure_editable(&self, action: &'static str) -> Result<(), SessionError> {
        match self.state {
            SessionState::Empty | SessionState::Loaded | SessionState::Edited => Ok(()),
            _ => Err(self.invalid(action)),
        }
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            from: self.state,
            action,
        }
    }
}

/// 1-based number of the first body line that would parse as a section boundary.
fn header_line_in(content: &str) -> Option<usize> {
    content
        .lines()
        .position(|line| line.starts_with(HEADER_DELIMITER))
        .map(|index| index + 1)
}

/// Checks that `messages` ends in a non-blank turn from [`USER_ROLE`].
pub fn check_admission(messages: &[Message]) -> Result<(), EmptyTurnError> {
    let Some(last) = messages.last() else {
        return Err(EmptyTurnError::NoMessages);
    };
    if last.role() != USER_ROLE {
        return Err(EmptyTurnError::NotUserTurn {
            role: last.role().to_string(),
        });
    }
    if last.is_blank() {
        return Err(EmptyTurnError::BlankLastMessage {
            role: last.role().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;

    fn stored() -> &'static str {
        "@@> user:\nhi\n\n@@> assistant:\nhello\n\n"
    }

    #[test]
    fn load_moves_to_loaded_even_for_empty_text() {
        let session = Session::load("").expect("empty text loads");
        assert_eq!(session.state(), SessionState::Loaded);
        assert!(session.messages().is_empty());
    }

    #[test]
    fn load_reports_corrupted_session() {
        let error = Session::load("@@> :\nbody\n").expect_err("corrupted text must fail");
        assert_matches!(error, SessionError::CorruptedSession(_));
    }

    #[test]
    fn editor_buffer_appends_blank_user_section() {
        let session = Session::load(stored()).expect("stored session loads");
        assert_eq!(
            session.editor_buffer(false),
            "@@> user:\nhi\n\n@@> assistant:\nhello\n\n@@> user:\n\n"
        );
    }

    #[test]
    fn reverse_editor_buffer_puts_new_turn_first() {
        let session = Session::load(stored()).expect("stored session loads");
        assert_eq!(
            session.editor_buffer(true),
            "@@> user:\n\n@@> assistant:\nhello\n\n@@> user:\nhi\n\n"
        );
    }

    #[test]
    fn reverse_edit_restores_chronological_order() {
        let mut session = Session::load(stored()).expect("stored session loads");
        let edited = session
            .editor_buffer(true)
            .replacen("@@> user:\n\n", "@@> user:\nhow are you?\n\n", 1);

        session.apply_edit(&edited, true).expect("edit applies");

        let roles: Vec<&str> = session.messages().iter().map(Message::role).collect();
        assert_eq!(roles, vec!["user", "assistant", "user"]);
        assert_eq!(session.messages()[2].content().trim(), "how are you?");
        assert_eq!(session.state(), SessionState::Edited);
    }

    #[test]
    fn append_input_extends_loaded_conversation() {
        let mut session = Session::load(stored()).expect("stored session loads");
        session.append_input("next question\n").expect("input appends");

        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.messages()[2], Message::user("next question\n"));
    }

    #[test]
    fn admission_rejects_assistant_and_blank_last_turns() {
        assert_eq!(check_admission(&[]), Err(EmptyTurnError::NoMessages));
        assert_matches!(
            check_admission(&[Message::user("hi"), Message::assistant("hello")]),
            Err(EmptyTurnError::NotUserTurn { role }) if role == "assistant"
        );
        assert_matches!(
            check_admission(&[Message::user(" \n\n")]),
            Err(EmptyTurnError::BlankLastMessage { .. })
        );
        assert_eq!(check_admission(&[Message::user("hi")]), Ok(()));
    }

    #[test]
    fn untouched_editor_buffer_fails_admission() {
        let mut session = Session::load(stored()).expect("stored session loads");
        let buffer = session.editor_buffer(false);
        session.apply_edit(&buffer, false).expect("edit applies");

        let error = session.admit().expect_err("blank new turn must be rejected");
        assert_matches!(
            error,
            SessionError::EmptyTurn(EmptyTurnError::BlankLastMessage { .. })
        );
        assert_eq!(session.state(), SessionState::Edited);
    }

    #[test]
    fn full_cycle_reaches_saved_and_can_continue() {
        let mut session = Session::new();
        session.apply_edit("What is Rust?\n", false).expect("edit applies");
        session.admit().expect("user turn is admitted");
        assert_eq!(session.state(), SessionState::AwaitingReply);

        session
            .record_reply(Message::assistant("A systems language."))
            .expect("reply records");
        assert_eq!(
            session.reply().map(Message::content),
            Some("A systems language.")
        );

        session.mark_saved().expect("replied session saves");
        assert_eq!(session.state(), SessionState::Saved);
        assert_eq!(
            session.render(),
            "@@> user:\nWhat is Rust?\n\n@@> assistant:\nA systems language.\n\n"
        );

        session.next_cycle().expect("saved session continues");
        assert_eq!(session.state(), SessionState::Loaded);
        assert!(session.reply().is_none());
    }

    #[test]
    fn out_of_order_transitions_are_rejected() {
        let mut session = Session::new();
        assert_matches!(
            session.record_reply(Message::assistant("early")),
            Err(SessionError::InvalidTransition {
                from: SessionState::Empty,
                ..
            })
        );
        assert_matches!(
            session.admit(),
            Err(SessionError::InvalidTransition { .. })
        );
        assert_matches!(
            session.mark_saved(),
            Err(SessionError::InvalidTransition { .. })
        );

        session.apply_edit("hi\n", false).expect("edit applies");
        session.admit().expect("admitted");
        assert_matches!(
            session.apply_edit("again\n", false),
            Err(SessionError::InvalidTransition {
                from: SessionState::AwaitingReply,
                ..
            })
        );
    }

    fn awaiting_reply() -> Session {
        let mut session = Session::new();
        session.apply_edit("hi\n", false).expect("edit applies");
        session.admit().expect("admitted");
        session
    }

    #[test]
    fn reply_with_a_header_line_is_rejected() {
        let mut session = awaiting_reply();
        assert_matches!(
            session.record_reply(Message::assistant("Like this:\n@@> user:\nhi\n")),
            Err(SessionError::HeaderInReply { line: 2 })
        );
        assert_matches!(
            session.record_reply(Message::assistant("@@>not a header\n")),
            Err(SessionError::HeaderInReply { line: 1 })
        );
        assert_eq!(session.state(), SessionState::AwaitingReply);
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn inline_delimiter_in_reply_round_trips() {
        let mut session = awaiting_reply();
        session
            .record_reply(Message::assistant("Headers look like `@@> user:`.\n  @@> indented\n"))
            .expect("inline delimiter is plain text");

        let reloaded = parse(&session.render()).expect("rendered session parses");
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded[1].role(), "assistant");
        assert_eq!(
            reloaded[1].content().trim_end(),
            "Headers look like `@@> user:`.\n  @@> indented"
        );
    }

    #[test]
    fn malformed_edit_is_distinguished_from_corrupted_file() {
        let mut session = Session::new();
        let error = session
            .apply_edit("@@> user\nhi\n", false)
            .expect_err("malformed edit must fail");
        assert_matches!(error, SessionError::MalformedEdit(_));
        assert_eq!(session.state(), SessionState::Empty);
    }
}
