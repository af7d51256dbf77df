//! Simple types for the LLM client

use crate::domain::types::ModelReply;

/// Errors carry the provider name and a message
pub type Error = crate::domain::traits::ModelError;

/// Token usage information
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Response from an LLM
#[derive(Debug, Clone)]
pub struct Response {
    pub reply: ModelReply,
    pub model: String,
    pub usage: TokenUsage,
}

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Groq,
    XAI,
    DeepAI,
}

impl Provider {
    pub fn as_str(&self) -> &str {
        match self {
            Provider::OpenAI => "openai",
            Provider::Groq => "groq",
            Provider::XAI => "xai",
            Provider::DeepAI => "deepai",
        }
    }

    /// Human-facing name, used in error replies.
    pub fn display_name(&self) -> &str {
        match self {
            Provider::OpenAI => "OpenAI",
            Provider::Groq => "Groq",
            Provider::XAI => "xAI",
            Provider::DeepAI => "DeepAI",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Some(Provider::OpenAI),
            "groq" => Some(Provider::Groq),
            "xai" => Some(Provider::XAI),
            "deepai" | "deep_ai" => Some(Provider::DeepAI),
            _ => None,
        }
    }

    /// Default API base for providers that mirror the OpenAI API.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::Groq => "https://api.groq.com/openai/v1",
            Provider::XAI => "https://api.x.ai/v1",
            Provider::DeepAI => "https://api.deepai.com/v1",
        }
    }
}
