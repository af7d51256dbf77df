//! # Domain Traits
//!
//! Abstract interfaces for the language model and process execution.
//! Allows for pluggable implementations in the Infrastructure layer (and scripted ones in tests).

use async_trait::async_trait;

use crate::domain::types::{ChatRequest, ModelReply};

/// Failure talking to the language model (network, rate limit, malformed response).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Error communicating with {provider}: {message}")]
pub struct ModelError {
    pub provider: String,
    pub message: String,
}

impl ModelError {
    pub fn new(provider: &str, message: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

/// Abstract interface for a tool-calling LLM
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion over the given history
    async fn complete(&self, request: ChatRequest) -> Result<ModelReply, ModelError>;
}

/// Captured output of a finished process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Spawns one external process, argv[0] being the program.
/// No shell is involved; the caller owns the timeout.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, argv: &[String]) -> std::io::Result<ProcessOutput>;
}
