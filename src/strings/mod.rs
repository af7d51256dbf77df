//! # Strings Module
//!
//! Centralizes user-facing strings, prompts, and the chat page.
//! Ensures consistency in messaging and easier localization/updates.

pub mod messages;
pub mod prompts;
pub mod templates;
