//! # LLM Providers
//!
//! All supported providers speak the OpenAI chat-completions protocol; they differ
//! only in base URL and credentials.

mod openai;

use crate::domain::config::AgentConfig;
use crate::domain::types::ChatRequest;
use crate::infrastructure::llm::{Error, Provider, Response};

/// Configuration for a provider
#[derive(Clone)]
pub struct ProviderConfig {
    /// API key
    pub api_key: String,
    /// Base URL (for non-default endpoints)
    pub base_url: Option<String>,
    /// Default model
    pub default_model: String,
    /// Timeout in seconds
    pub timeout: Option<u64>,
}

impl ProviderConfig {
    pub fn from_agent_config(config: &AgentConfig) -> Result<Self, Error> {
        let api_key = if let Some(key) = &config.api_key {
            key.clone()
        } else if let Some(env_var) = &config.api_key_env {
            std::env::var(env_var).map_err(|e| {
                Error::new(
                    &config.provider,
                    format!("API key env var {} not set: {}", env_var, e),
                )
            })?
        } else {
            return Err(Error::new(
                &config.provider,
                "No API key provided - set api_key or api_key_env",
            ));
        };

        Ok(Self {
            api_key,
            base_url: config.endpoint.clone(),
            default_model: config.model.clone(),
            timeout: config.timeout,
        })
    }
}

/// Execute a chat request with the specified provider
pub async fn chat(
    provider: Provider,
    config: ProviderConfig,
    request: ChatRequest,
) -> Result<Response, Error> {
    match provider {
        Provider::OpenAI | Provider::Groq | Provider::XAI | Provider::DeepAI => {
            openai::chat(provider, config, request).await
        }
    }
}
