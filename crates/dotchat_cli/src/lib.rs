//! `dotchat` command-line host.
//!
//! ## Pipeline
//!
//! One invocation loads at most one stored session, takes the next user turn
//! from the editor (interactive stdin) or from piped stdin, asks the selected
//! provider for a single reply, prints it (as rendered markdown on a terminal),
//! and optionally saves the conversation document. Unnamed sessions are named
//! from a provider-written summary plus a CRC-32 fingerprint of the conversation.
//!
//! ## Settings precedence
//!
//! Command-line flags, then `DOTCHAT_*` environment variables, then the JSON
//! config file (`--config` or `DOTCHAT_CONFIG`), then built-in defaults.
//! Unknown config fields are rejected.
//!
//! ## Exit codes
//!
//! Usage errors, including a conversation that does not end in a non-empty user
//! turn, exit with status 2; every other failure exits with status 1.

pub mod app;
pub mod cli;
pub mod config;
pub mod console;
pub mod credentials;
pub mod editor;
pub mod error;
pub mod markdown;
pub mod output;
pub mod providers;
