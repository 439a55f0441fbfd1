use std::fmt;

use thiserror::Error;

/// Which part of a header line failed to match `@@> <role>: `.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// `@@>` is not followed by a space or tab.
    MissingDelimiterWhitespace,
    /// No ASCII letters where the role token belongs.
    MissingRole,
    /// The role token is not terminated by `:`.
    MissingColon,
    /// The `:` is followed by neither whitespace nor a line break.
    MissingTrailingWhitespace,
    /// Headerless lines, blank ones included, precede the first header.
    ContentBeforeHeader,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MissingDelimiterWhitespace => "expected whitespace after '@@>'",
            Self::MissingRole => "expected a role made of ASCII letters",
            Self::MissingColon => "expected ':' after the role",
            Self::MissingTrailingWhitespace => "expected whitespace or a line break after ':'",
            Self::ContentBeforeHeader => "text before the first '@@>' header",
        };
        f.write_str(text)
    }
}

/// Malformed conversation document. The document is presumed corrupted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed header on line {line}: {kind}: {text:?}")]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
    /// Offending line without its line terminator.
    pub text: String,
}

impl ParseError {
    #[must_use]
    pub fn new(line: usize, kind: ParseErrorKind, text: impl Into<String>) -> Self {
        Self {
            line,
            kind,
            text: text.into(),
        }
    }
}

/// Admission-control failure: the conversation does not end in a non-empty user turn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmptyTurnError {
    #[error("aborting request due to empty message: the conversation has no messages")]
    NoMessages,
    #[error("aborting request due to empty message: the last {role} message is blank")]
    BlankLastMessage { role: String },
    #[error("aborting request due to empty message: the last message is from '{role}', not 'user'")]
    NotUserTurn { role: String },
}

/// Document bytes that are not valid UTF-8.
#[derive(Debug, Error)]
#[error("document is not valid UTF-8 (from {source_name}): {source}")]
pub struct EncodingError {
    pub source_name: String,
    #[source]
    pub source: std::string::FromUtf8Error,
}

/// Failure of one session pipeline step, labelled with the stage that produced it.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to parse stored session: {0}")]
    CorruptedSession(#[source] ParseError),

    #[error("failed to parse edited conversation: {0}")]
    MalformedEdit(#[source] ParseError),

    #[error(transparent)]
    EmptyTurn(#[from] EmptyTurnError),

    #[error("reply line {line} starts with '@@>' and would split the conversation")]
    HeaderInReply { line: usize },

    #[error("cannot {action} while the session is {from}")]
    InvalidTransition {
        from: crate::session::SessionState,
        action: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display_names_line_and_kind() {
        let error = ParseError::new(3, ParseErrorKind::MissingRole, "@@> :");
        assert_eq!(
            error.to_string(),
            "malformed header on line 3: expected a role made of ASCII letters: \"@@> :\""
        );
    }

    #[test]
    fn empty_turn_display_keeps_usage_wording() {
        let error = EmptyTurnError::NotUserTurn {
            role: "assistant".to_string(),
        };
        assert!(error
            .to_string()
            .starts_with("aborting request due to empty message"));
    }
}
