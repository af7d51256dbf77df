//! # LLM Client
//!
//! Provides the `Client` struct, which acts as the main entry point for LLM interactions.
//! It routes requests to the configured provider and implements the domain `ChatModel` seam.

use async_trait::async_trait;

use crate::domain::config::AgentConfig;
use crate::domain::traits::ChatModel;
use crate::domain::types::{ChatRequest, ModelReply};
use crate::infrastructure::llm::providers;
use crate::infrastructure::llm::{Error, Provider, Response};

/// Simple LLM client
pub struct Client {
    agent: AgentConfig,
}

impl Client {
    /// Create a new client from the agent section of the configuration
    pub fn new(agent: AgentConfig) -> Self {
        Self { agent }
    }

    pub fn provider(&self) -> Result<Provider, Error> {
        Provider::from_str(&self.agent.provider)
            .ok_or_else(|| Error::new(&self.agent.provider, "Unknown provider"))
    }

    /// Send a chat request to the configured provider
    pub async fn chat(&self, request: ChatRequest) -> Result<Response, Error> {
        let provider_type = self.provider()?;

        // Credentials are resolved per request so a key exported after startup is picked up.
        let provider_config = providers::ProviderConfig::from_agent_config(&self.agent)
            .map_err(|e| Error::new(provider_type.display_name(), e.message))?;

        providers::chat(provider_type, provider_config, request).await
    }
}

#[async_trait]
impl ChatModel for Client {
    async fn complete(&self, request: ChatRequest) -> Result<ModelReply, Error> {
        self.chat(request).await.map(|r| r.reply)
    }
}
