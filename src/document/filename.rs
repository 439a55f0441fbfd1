//! Content-addressed names for autosaved sessions.

use crate::message::Message;

/// Hex digits kept from the checksum.
pub const FINGERPRINT_LEN: usize = 5;
/// Extension appended by [`derive_filename`].
pub const DEFAULT_EXTENSION: &str = ".dcb";
/// Slug used when the hint has no usable characters.
pub const FALLBACK_SLUG: &str = "session";

/// CRC-32 (IEEE) over every body in sequence order, as [`FINGERPRINT_LEN`] lowercase hex digits.
///
/// The unpadded hex checksum is left-padded with zeros to the fingerprint length and
/// then truncated, so leading digits are kept. Roles do not contribute.
#[must_use]
pub fn fingerprint(messages: &[Message]) -> String {
    let mut hasher = crc32fast::Hasher::new();
    for message in messages {
        hasher.update(message.content().as_bytes());
    }
    let hex = format!("{:x}", hasher.finalize());
    let mut padded = format!("{hex:0>width$}", width = FINGERPRINT_LEN);
    padded.truncate(FINGERPRINT_LEN);
    padded
}

/// Lowercases the hint, turns whitespace runs into `-`, and drops everything outside `[a-z0-9-]`.
#[must_use]
pub fn slugify(hint: &str) -> String {
    let lowered = hint.trim().to_lowercase();
    let hyphenated = lowered.split_whitespace().collect::<Vec<_>>().join("-");
    hyphenated
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-')
        .collect()
}

/// `{slug}-{fingerprint}{DEFAULT_EXTENSION}` for a summary hint and a conversation.
#[must_use]
pub fn derive_filename(hint: &str, messages: &[Message]) -> String {
    derive_filename_with_extension(hint, messages, DEFAULT_EXTENSION)
}

/// Like [`derive_filename`] with a caller-chosen extension; a missing leading dot is added.
#[must_use]
pub fn derive_filename_with_extension(
    hint: &str,
    messages: &[Message],
    extension: &str,
) -> String {
    let mut slug = slugify(hint);
    if slug.trim_matches('-').is_empty() {
        slug = FALLBACK_SLUG.to_string();
    }

    let extension = extension.trim();
    let dot = if extension.is_empty() || extension.starts_with('.') {
        ""
    } else {
        "."
    };

    format!("{slug}-{}{dot}{extension}", fingerprint(messages))
}
