//! Single-pass line scanner for conversation documents.
//!
//! Grammar, line oriented:
//!
//! ```text
//! start   := section+ | content
//! section := header content
//! header  := "@@>" ws role ":" ws
//! role    := [A-Za-z]+
//! content := line*          ; lines not starting with "@@>"
//! ```
//!
//! Sections are emitted as soon as the next header (or end of input) closes them.
//! Body fragments keep their line terminators so joining them reproduces the source.

use crate::error::{ParseError, ParseErrorKind};
use crate::message::{Message, Messages};

use super::HEADER_DELIMITER;

/// Parses document text into an ordered message sequence.
///
/// Whitespace-only input yields an empty sequence. Text without any header is one
/// implicit `user` message holding the whole input verbatim.
pub fn parse(text: &str) -> Result<Messages, ParseError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut scanner = Scanner::default();
    for (index, line) in text.split_inclusive('\n').enumerate() {
        scanner.feed(index + 1, line)?;
    }
    Ok(scanner.finish())
}

#[derive(Debug)]
enum ScanState {
    /// No header seen yet; holds every line so far.
    Preamble {
        text: String,
        first_content_line: Option<usize>,
    },
    /// Inside the body of a section.
    Section { role: String, body: String },
}

impl Default for ScanState {
    fn default() -> Self {
        Self::Preamble {
            text: String::new(),
            first_content_line: None,
        }
    }
}

#[derive(Debug, Default)]
struct Scanner {
    state: ScanState,
    messages: Messages,
}

impl Scanner {
    fn feed(&mut self, line_number: usize, line: &str) -> Result<(), ParseError> {
        if !line.starts_with(HEADER_DELIMITER) {
            match &mut self.state {
                ScanState::Preamble {
                    text,
                    first_content_line,
                } => {
                    if first_content_line.is_none() && !line.trim().is_empty() {
                        *first_content_line = Some(line_number);
                    }
                    text.push_str(line);
                }
                ScanState::Section { body, .. } => body.push_str(line),
            }
            return Ok(());
        }

        let header = parse_header(line_number, line)?;
        let previous = std::mem::replace(
            &mut self.state,
            ScanState::Section {
                role: header.role.to_string(),
                body: header.first_fragment,
            },
        );

        match previous {
            ScanState::Preamble {
                text,
                first_content_line,
            } if !text.is_empty() => {
                // Blank lines report line 1; otherwise the first non-blank line.
                let content_line = first_content_line.unwrap_or(1);
                let offending = text
                    .split_inclusive('\n')
                    .nth(content_line - 1)
                    .map(strip_terminator)
                    .unwrap_or_default();
                Err(ParseError::new(
                    content_line,
                    ParseErrorKind::ContentBeforeHeader,
                    offending,
                ))
            }
            ScanState::Preamble { .. } => Ok(()),
            ScanState::Section { role, body } => {
                self.messages.push(Message::new(role, body));
                Ok(())
            }
        }
    }

    fn finish(mut self) -> Messages {
        match self.state {
            ScanState::Preamble { text, .. } => vec![Message::user(text)],
            ScanState::Section { role, body } => {
                self.messages.push(Message::new(role, body));
                self.messages
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Header<'a> {
    role: &'a str,
    /// Text following the header on the same line, with the line terminator kept.
    first_fragment: String,
}

fn parse_header(line_number: usize, line: &str) -> Result<Header<'_>, ParseError> {
    let content = strip_terminator(line);
    let terminator = &line[content.len()..];
    let fail = |kind| ParseError::new(line_number, kind, content);

    let after_delimiter = &content[HEADER_DELIMITER.len()..];
    let role_start = after_delimiter.trim_start_matches(is_inline_space);
    if role_start.len() == after_delimiter.len() {
        return Err(fail(ParseErrorKind::MissingDelimiterWhitespace));
    }

    let role_len = role_start
        .bytes()
        .take_while(u8::is_ascii_alphabetic)
        .count();
    if role_len == 0 {
        return Err(fail(ParseErrorKind::MissingRole));
    }
    let (role, after_role) = role_start.split_at(role_len);

    let Some(after_colon) = after_role.strip_prefix(':') else {
        return Err(fail(ParseErrorKind::MissingColon));
    };

    let first_fragment = match after_colon.chars().next() {
        None if terminator.is_empty() => {
            return Err(fail(ParseErrorKind::MissingTrailingWhitespace));
        }
        None => String::new(),
        Some(ch) if !ch.is_whitespace() => {
            return Err(fail(ParseErrorKind::MissingTrailingWhitespace));
        }
        Some(_) => {
            let rest = after_colon.trim_start_matches(is_inline_space);
            if rest.trim().is_empty() {
                String::new()
            } else {
                format!("{rest}{terminator}")
            }
        }
    };

    Ok(Header {
        role,
        first_fragment,
    })
}

fn is_inline_space(ch: char) -> bool {
    matches!(ch, ' ' | '\t')
}

fn strip_terminator(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;

    fn roles_and_bodies(messages: &[Message]) -> Vec<(&str, &str)> {
        messages
            .iter()
            .map(|message| (message.role(), message.content()))
            .collect()
    }

    #[test]
    fn empty_and_whitespace_inputs_yield_no_messages() {
        assert!(parse("").expect("empty parses").is_empty());
        assert!(parse("   \n").expect("blank parses").is_empty());
        assert!(parse("\n\n\t\n").expect("blank lines parse").is_empty());
    }

    #[test]
    fn headerless_document_is_one_user_message() {
        let messages = parse("hello\n").expect("headerless parses");
        assert_eq!(roles_and_bodies(&messages), vec![("user", "hello\n")]);
    }

    #[test]
    fn headerless_document_keeps_inner_blank_lines() {
        let messages = parse("first\n\n  second\n").expect("headerless parses");
        assert_eq!(
            roles_and_bodies(&messages),
            vec![("user", "first\n\n  second\n")]
        );
    }

    #[test]
    fn sections_are_emitted_in_document_order() {
        let messages = parse("@@> user:\none\n@@> assistant:\ntwo\n@@> user:\nthree\n")
            .expect("sections parse");
        assert_eq!(
            roles_and_bodies(&messages),
            vec![
                ("user", "one\n"),
                ("assistant", "two\n"),
                ("user", "three\n"),
            ]
        );
    }

    #[test]
    fn blank_separator_lines_stay_in_the_preceding_body() {
        let messages =
            parse("@@> user:\none\n\n@@> assistant:\ntwo\n\n").expect("rendered form parses");
        assert_eq!(
            roles_and_bodies(&messages),
            vec![("user", "one\n\n"), ("assistant", "two\n\n")]
        );
    }

    #[test]
    fn leading_whitespace_of_the_first_body_line_is_preserved() {
        let messages = parse("@@> user:\n\n    indented\n").expect("indented body parses");
        assert_eq!(roles_and_bodies(&messages), vec![("user", "\n    indented\n")]);
    }

    #[test]
    fn text_after_the_header_colon_starts_the_body() {
        let messages = parse("@@> user: hi there\nmore\n").expect("inline body parses");
        assert_eq!(roles_and_bodies(&messages), vec![("user", "hi there\nmore\n")]);
    }

    #[test]
    fn trailing_spaces_after_the_colon_are_consumed() {
        let messages = parse("@@> user: \nbody\n").expect("header with space parses");
        assert_eq!(roles_and_bodies(&messages), vec![("user", "body\n")]);
    }

    #[test]
    fn empty_trailing_section_is_kept() {
        let messages = parse("@@> assistant:\nhi\n\n@@> user:\n\n").expect("template parses");
        assert_eq!(
            roles_and_bodies(&messages),
            vec![("assistant", "hi\n\n"), ("user", "\n")]
        );
    }

    #[test]
    fn roles_pass_through_verbatim() {
        let messages = parse("@@> System:\nbe brief\n@@> Narrator:\nonce\n").expect("parses");
        assert_eq!(
            roles_and_bodies(&messages),
            vec![("System", "be brief\n"), ("Narrator", "once\n")]
        );
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let messages = parse("@@> user:\r\nhello\r\n@@> assistant:\r\nhi\r\n").expect("crlf parses");
        assert_eq!(
            roles_and_bodies(&messages),
            vec![("user", "hello\r\n"), ("assistant", "hi\r\n")]
        );
    }

    #[test]
    fn delimiter_is_only_recognized_at_line_start() {
        let messages = parse("@@> user:\nsee  @@> user: inline\n").expect("parses");
        assert_eq!(
            roles_and_bodies(&messages),
            vec![("user", "see  @@> user: inline\n")]
        );
    }

    #[test]
    fn blank_lines_before_the_first_header_are_rejected() {
        let error = parse("\n\n@@> user:\nhi\n").expect_err("section+ must start at a header");
        assert_eq!(error.line, 1);
        assert_eq!(error.kind, ParseErrorKind::ContentBeforeHeader);
        assert_eq!(error.text, "");
    }

    #[test]
    fn missing_role_is_a_parse_error() {
        let error = parse("@@> :\nbody\n").expect_err("missing role must fail");
        assert_eq!(error.line, 1);
        assert_eq!(error.kind, ParseErrorKind::MissingRole);
        assert_eq!(error.text, "@@> :");
    }

    #[test]
    fn malformed_headers_report_the_failing_part() {
        assert_matches!(
            parse("@@>user:\nx\n"),
            Err(ParseError {
                kind: ParseErrorKind::MissingDelimiterWhitespace,
                ..
            })
        );
        assert_matches!(
            parse("@@> user\nx\n"),
            Err(ParseError {
                kind: ParseErrorKind::MissingColon,
                ..
            })
        );
        assert_matches!(
            parse("@@> us3r:\nx\n"),
            Err(ParseError {
                kind: ParseErrorKind::MissingColon,
                ..
            })
        );
        assert_matches!(
            parse("@@> user:x\n"),
            Err(ParseError {
                kind: ParseErrorKind::MissingTrailingWhitespace,
                ..
            })
        );
        assert_matches!(
            parse("@@> user:"),
            Err(ParseError {
                kind: ParseErrorKind::MissingTrailingWhitespace,
                ..
            })
        );
    }

    #[test]
    fn malformed_header_after_valid_sections_reports_its_line() {
        let error = parse("@@> user:\nhi\n@@> assistant:\nhey\n@@>\n").expect_err("must fail");
        assert_eq!(error.line, 5);
        assert_eq!(error.kind, ParseErrorKind::MissingDelimiterWhitespace);
    }

    #[test]
    fn content_before_the_first_header_is_rejected() {
        let error = parse("\nstray\n@@> user:\nhi\n").expect_err("must fail");
        assert_eq!(error.line, 2);
        assert_eq!(error.kind, ParseErrorKind::ContentBeforeHeader);
        assert_eq!(error.text, "stray");
    }

    #[test]
    fn header_without_trailing_newline_at_end_is_valid_with_inline_text() {
        let messages = parse("@@> user: last words").expect("inline final header parses");
        assert_eq!(roles_and_bodies(&messages), vec![("user", "last words")]);
    }
}
