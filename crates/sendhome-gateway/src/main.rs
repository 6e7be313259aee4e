//! Send Me Home gateway: loads configuration, wires the collaborators into a
//! `GameService` and serves the HTTP API.

mod api_error;
mod routes;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use sendhome_core::{GameConfig, GameService, SledSessionStore};
use sendhome_voice::{ElevenLabsSynthesizer, NameHashVoicePolicy};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::routes::{build_app, AppState};

#[tokio::main]
async fn main() {
    // Keys for the narrative and voice backends usually live in `.env`.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("[sendhome-gateway] .env not loaded: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "gateway stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = GameConfig::load()?;
    tracing::info!(
        version = sendhome_core::version(),
        storage = %config.storage_path,
        policy = ?config.resolution_policy,
        "starting Send Me Home gateway"
    );

    let store = SledSessionStore::open(&config.storage_path)?;
    let narrator = sendhome_narrative::from_config(&config.narrative);
    let synthesizer = ElevenLabsSynthesizer::from_config(&config.voice);
    if !synthesizer.is_configured() {
        tracing::warn!("no voice API key; NPCs will be silent");
    }

    let cors_origins = config.cors_origin_list();
    let public_dir = config
        .public_dir
        .as_deref()
        .map(PathBuf::from)
        .filter(|dir| dir.is_dir());
    let port = config.port;

    let service = GameService::new(
        config,
        Arc::new(store),
        narrator,
        Arc::new(synthesizer),
        Arc::new(NameHashVoicePolicy),
    );
    let app = build_app(
        AppState {
            service: Arc::new(service),
        },
        &cors_origins,
        public_dir.as_deref(),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
