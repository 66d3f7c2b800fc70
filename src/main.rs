use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod api;
mod authorize;
mod config;
mod service;

use config::Config;
use service::HttpAuthorizationService;

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    // Initialize color_eyre
    color_eyre::install()?;

    let config = Config::parse();

    // Initialize tracing subscriber
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log)?)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let service = HttpAuthorizationService::new(
        &config.authorization_service_url,
        config.service_timeout(),
    )?;
    let state = api::AppState::new(Arc::new(service), config.flow_idle_timeout());
    tokio::spawn(state.clone().sweep_idle_flows());
    let app = api::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    tracing::info!(
        address = %config.listen,
        authorization_service = %config.authorization_service_url,
        "consent backend listening"
    );

    axum::serve(listener, app).await?;

    Ok(())
}
