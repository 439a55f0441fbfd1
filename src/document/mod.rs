//! Conversation document format.
//!
//! A document is either a run of `@@> role:` sections or a single headerless body
//! (an implicit user turn). It is both the on-disk session format and the live
//! editing buffer, so [`render`] output must always [`parse`] back to the same
//! messages modulo trailing whitespace of each body.

mod filename;
mod parser;
mod render;

pub use filename::{
    derive_filename, derive_filename_with_extension, fingerprint, slugify, DEFAULT_EXTENSION,
    FALLBACK_SLUG, FINGERPRINT_LEN,
};
pub use parser::parse;
pub use render::render;

use crate::error::EncodingError;

/// Marker that introduces a section header at the start of a line.
pub const HEADER_DELIMITER: &str = "@@>";

/// Empty user section appended (or prepended in reverse mode) to the editor buffer.
pub const NEW_USER_TEMPLATE: &str = "@@> user:\n\n";

/// Decodes raw document bytes from a text source.
///
/// `source_name` identifies the origin (a path, `stdin`, `editor`) in the error.
pub fn decode_document(
    bytes: Vec<u8>,
    source_name: impl Into<String>,
) -> Result<String, EncodingError> {
    String::from_utf8(bytes).map_err(|source| EncodingError {
        source_name: source_name.into(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_document_accepts_utf8() {
        let text = decode_document("@@> user:\nhé\n".as_bytes().to_vec(), "stdin")
            .expect("valid UTF-8 decodes");
        assert_eq!(text, "@@> user:\nhé\n");
    }

    #[test]
    fn decode_document_names_the_source_on_failure() {
        let error = decode_document(vec![0x40, 0xff, 0xfe], "/tmp/broken.dcb")
            .expect_err("invalid UTF-8 must fail");
        assert_eq!(error.source_name, "/tmp/broken.dcb");
        assert!(error.to_string().contains("/tmp/broken.dcb"));
    }

    #[test]
    fn new_user_template_parses_as_blank_user_turn() {
        let messages = parse(NEW_USER_TEMPLATE).expect("template parses");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].is_user());
        assert!(messages[0].is_blank());
    }
}
