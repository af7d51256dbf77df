//! # Main Entry Point
//!
//! Initializes the application:
//! - Domain: Configuration and Types
//! - Infrastructure: LLM client, command policy and executor
//! - Application: Conversation store, tool-call orchestrator
//! - Interface: HTTP routes
//!

mod application;
mod domain;
mod infrastructure;
mod interface;
mod strings;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::application::conversation::ConversationStore;
use crate::application::orchestrator::Orchestrator;
use crate::domain::config::AppConfig;
use crate::infrastructure::llm::Client as LlmClient;
use crate::infrastructure::tools::executor::CommandExecutor;
use crate::infrastructure::tools::policy::CommandPolicy;
use crate::interface::http::{self, AppState};

/// Chat with your Kubernetes cluster.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "data/config.yaml")]
    config: PathBuf,

    /// Listen port (overrides config and PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Listen address (overrides config)
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    // 1. Load Configuration
    let mut config = AppConfig::load(&cli.config)?;
    config.apply_env();
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }

    // 2. Logging Setup
    // Ensure data directory exists
    if !std::path::Path::new("data").exists() {
        fs::create_dir("data").context("Failed to create data directory")?;
    }

    // Clear previous session log
    let log_path = std::path::Path::new("data/session.log");
    if log_path.exists() {
        let _ = fs::remove_file(log_path);
    }

    let file_appender = tracing_appender::rolling::never("data", "session.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let default_filter = if config.server.debug {
        "debug,hyper=info,reqwest=info"
    } else {
        "info,hyper=warn,reqwest=warn,tower_http=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    // Layer for file (Always active)
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::info!("Starting kubechat {}...", http::VERSION);
    if cli.config.exists() {
        tracing::info!("Loaded configuration from {}", cli.config.display());
    } else {
        tracing::warn!("Config file {} not found, using defaults", cli.config.display());
    }

    // 3. Initialize Infrastructure
    let policy = CommandPolicy::new(&config.commands.tool, &config.commands.allowed_verbs);
    tracing::info!(
        tool = %policy.tool(),
        verbs = %policy.verbs().collect::<Vec<_>>().join(","),
        "Command policy loaded"
    );
    if policy.is_allowed("exec") || policy.is_allowed("scale") {
        tracing::warn!("Policy allows cluster-mutating verbs (exec/scale); verb checks do not inspect flags");
    }

    let system_prompt = strings::prompts::system_prompt(&policy);
    let executor = Arc::new(CommandExecutor::new(
        policy,
        Duration::from_secs(config.commands.timeout_secs),
    ));

    let llm = Arc::new(LlmClient::new(config.agent.clone()));
    if let Err(e) = llm.provider() {
        tracing::error!("{}", e);
    }
    if config.agent.api_key.is_none()
        && let Some(var) = &config.agent.api_key_env
        && std::env::var(var).is_err()
    {
        tracing::warn!("{} is not set; model calls will fail until it is", var);
    }

    // 4. Initialize Application Components
    let store = Arc::new(ConversationStore::new(system_prompt, &config.sessions));
    let orchestrator = Arc::new(Orchestrator::new(
        llm,
        executor,
        store,
        config.sampling.clone(),
    ));

    // 5. Serve
    let app = http::router(AppState::new(orchestrator));
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
        .context("HTTP server error")?;

    Ok(())
}
