mod classifier;
mod config;
mod llm;
mod platform;
mod prompt;
mod responder;
#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::llm::GeminiClient;
use crate::platform::line::LineClient;
use crate::platform::webhook::{self, WebhookState};
use crate::prompt::PromptBuilder;
use crate::responder::Responder;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,linetutor=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Secrets usually come from the deployment environment; a local .env is a convenience
    if let Ok(path) = dotenvy::dotenv() {
        info!("Loaded environment from: {}", path.display());
    }

    // Load configuration
    let explicit_path = std::env::args().nth(1).map(PathBuf::from);
    let config_path = explicit_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path, explicit_path.is_some())
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Native language: {}", config.tutor.native_language);
    info!("  Listen: {}", config.server.bind_addr());

    let gemini = GeminiClient::new(&config.gemini).context("Failed to build Gemini client")?;
    info!("Gemini client ready (model {})", gemini.model());
    let responder = Responder::new(
        Arc::new(gemini),
        PromptBuilder::new(config.tutor.native_language.clone()),
    );

    let state = WebhookState {
        responder: Arc::new(responder),
        replier: Arc::new(LineClient::new(&config.line)),
        channel_secret: config.line.channel_secret.clone(),
    };

    info!("Bot is starting...");
    webhook::run(state, &config.server.bind_addr()).await?;

    Ok(())
}
