//! Presentation Server
//!
//! Holds the authoritative content/line state and broadcasts it to every
//! connected presenter, overlay, and controller client.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gurbani_presenter::{
    config::{self, AppConfig},
    provider::{DataProvider, JsonProvider},
    server::Server,
    settings::GlobalSettings,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Gurbani Presenter server");

    // Load config: explicit path from args, discovered file, or defaults
    let explicit = std::env::args().nth(1).map(PathBuf::from);
    let file = match config::find_config_file(explicit.as_deref()) {
        Some(path) => {
            tracing::info!("Using config file {}", path.display());
            Some(config::load_config(&path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(file);

    // Open the text library
    let provider: Arc<dyn DataProvider> = match &config.library {
        Some(path) => Arc::new(JsonProvider::load(path).await?),
        None => {
            tracing::warn!("No library configured; serving an empty library");
            Arc::new(JsonProvider::empty())
        }
    };

    // Global settings are loaded once and persisted on every change
    let global = GlobalSettings::load(config.settings_file.clone()).await?;

    let server = Server::new(provider, global);
    let addr = config.addr()?;

    tracing::info!(
        "Clients can connect at ws://{}:{}/api",
        config.bind_address,
        config.port
    );

    server.serve(addr).await?;

    Ok(())
}
