//! DeepDrone - HTTP Server Entry Point
//!
//! Starts the HTTP server that exposes the chat and mission API.

use deepdrone::{api, config::Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deepdrone=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: tool_model={}, chat_model={}{}",
        config.tool_provider.model,
        config.chat_provider.model,
        if config.chat_api_key.is_some() {
            ""
        } else {
            " (no key)"
        }
    );
    info!(
        "Default drone connection: {}, waypoint transit {:?}",
        config.drone_connection, config.mission_timing.transit_delay
    );

    // Start HTTP server
    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting server on {}", addr);

    api::serve(config).await?;

    Ok(())
}
