//! # Configuration
//!
//! Manages the loading and parsing of the application's configuration file (`config.yaml`).
//! Every section carries serde defaults, so a partial file (or no file at all) still yields
//! a usable configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
}

impl AppConfig {
    /// Reads the config file at `path`. A missing file falls back to defaults;
    /// a file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an empty mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies `PORT` and `APP_ENV` from the process environment.
    pub fn apply_env(&mut self) {
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if std::env::var("APP_ENV").is_ok_and(|v| v == "development") {
            self.server.debug = true;
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}

/// The language model backing the assistant.
#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>, // e.g. "GROQ_API_KEY"
    /// Request timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            endpoint: None,
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout: None,
        }
    }
}

fn default_provider() -> String {
    "groq".to_string()
}
fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}
fn default_api_key_env() -> Option<String> {
    Some("GROQ_API_KEY".to_string())
}

/// Sampling parameters for a single model call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// The tool-selection turn and the summary turn use separate settings.
/// Each field falls back to its own turn's default when omitted.
#[derive(Debug, Deserialize, Clone)]
#[serde(from = "RawSamplingConfig")]
pub struct SamplingConfig {
    pub tool_turn: Sampling,
    pub summary_turn: Sampling,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            tool_turn: default_tool_turn(),
            summary_turn: default_summary_turn(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawSamplingConfig {
    tool_turn: PartialSampling,
    summary_turn: PartialSampling,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PartialSampling {
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl PartialSampling {
    fn or(self, base: Sampling) -> Sampling {
        Sampling {
            temperature: self.temperature.unwrap_or(base.temperature),
            max_tokens: self.max_tokens.unwrap_or(base.max_tokens),
        }
    }
}

impl From<RawSamplingConfig> for SamplingConfig {
    fn from(raw: RawSamplingConfig) -> Self {
        Self {
            tool_turn: raw.tool_turn.or(default_tool_turn()),
            summary_turn: raw.summary_turn.or(default_summary_turn()),
        }
    }
}

fn default_tool_turn() -> Sampling {
    Sampling {
        temperature: 0.35,
        max_tokens: 1200,
    }
}
fn default_summary_turn() -> Sampling {
    Sampling {
        temperature: 0.25,
        max_tokens: 1000,
    }
}

/// External command policy and limits.
#[derive(Debug, Deserialize, Clone)]
pub struct CommandsConfig {
    #[serde(default = "default_tool")]
    pub tool: String,
    #[serde(default = "default_allowed_verbs")]
    pub allowed_verbs: Vec<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            tool: default_tool(),
            allowed_verbs: default_allowed_verbs(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_tool() -> String {
    "kubectl".to_string()
}

fn default_allowed_verbs() -> Vec<String> {
    [
        "get",
        "describe",
        "logs",
        "top",
        "exec",
        "scale",
        "rollout",
        "explain",
        "api-resources",
        "api-versions",
    ]
    .iter()
    .map(|v| v.to_string())
    .collect()
}

fn default_timeout() -> u64 {
    45
}

/// Conversation retention.
#[derive(Debug, Deserialize, Clone)]
pub struct SessionsConfig {
    /// History ceiling per session, system prompt included.
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    /// Maximum number of live sessions before LRU eviction.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            capacity: default_capacity(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

fn default_max_messages() -> usize {
    28
}
fn default_capacity() -> usize {
    1024
}
fn default_idle_timeout() -> u64 {
    3600
}
