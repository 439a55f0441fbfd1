//! Plain-text conversation documents for command-line chat sessions.
//!
//! Invariant: `parse(&render(messages))` yields the same roles and bodies as
//! `messages`, modulo trailing whitespace of each body.
//!
//! # Public API Overview
//! - [`parse`] turns document text into [`Messages`]; [`render`] is the inverse.
//! - [`derive_filename`] names an unnamed session from a summary hint and a CRC-32
//!   fingerprint of the conversation.
//! - [`Session`] tracks one invocation's lifecycle and owns the admission gate that
//!   must pass before a reply is requested.

pub mod document;
pub mod error;
pub mod message;
pub mod session;

pub use crate::document::{
    decode_document, derive_filename, derive_filename_with_extension, fingerprint, parse,
    render, slugify, DEFAULT_EXTENSION, FINGERPRINT_LEN, HEADER_DELIMITER, NEW_USER_TEMPLATE,
};
pub use crate::error::{EmptyTurnError, EncodingError, ParseError, ParseErrorKind, SessionError};
pub use crate::message::{Message, Messages, ASSISTANT_ROLE, SYSTEM_ROLE, USER_ROLE};
pub use crate::session::{check_admission, Session, SessionState};
