//! OpenAI-compatible tool-calling client
//!
//! Provides a single `Client` that speaks the chat-completions function-calling
//! protocol to OpenAI and the providers that mirror its API (Groq, xAI, DeepAI).

mod client;
pub mod providers;
mod types;

pub use client::Client;

pub use types::{Error, Provider, Response, TokenUsage};
