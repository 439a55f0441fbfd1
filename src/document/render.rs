use crate::message::Message;

use super::HEADER_DELIMITER;

/// Serializes messages into canonical document text.
///
/// Each section is `@@> {role}:` on its own line followed by the body with trailing
/// whitespace removed. Sections are separated by one blank line and the document
/// ends with a blank line. An empty sequence renders as the empty string.
#[must_use]
pub fn render(messages: &[Message]) -> String {
    if messages.is_empty() {
        return String::new();
    }

    let sections: Vec<String> = messages.iter().map(render_section).collect();
    let mut document = sections.join("\n\n");
    document.push_str("\n\n");
    document
}

fn render_section(message: &Message) -> String {
    format!(
        "{HEADER_DELIMITER} {}:\n{}",
        message.role(),
        message.content().trim_end()
    )
}
