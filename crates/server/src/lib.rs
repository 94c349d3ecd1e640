//! Customer Profile Server Library
//!
//! Per-user customer profile resource over HTTP: bearer-session auth,
//! SQLite record storage, and public media storage for profile images.

pub mod auth;
pub mod config;
pub mod error;
pub mod media;
pub mod profile;
pub mod router;

use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use auth::AuthManager;
use config::{AppState, ServerConfig};
use media_store::MediaStore;
use profile::store::ProfileManager;

pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        // Already set, ignore
    }

    info!("=== Customer Profile Server ===");

    // Initialize configuration
    let config = ServerConfig::default();
    config.ensure_dirs().await?;

    info!("Data directory: {:?}", config.data_dir);
    info!("Media directory: {:?}", config.media_dir);

    // Initialize Auth Manager
    let auth = Arc::new(AuthManager::new(&config.data_dir).await?);
    info!("Auth Manager initialized");

    // Initialize Profile Manager
    let profiles = Arc::new(ProfileManager::new(&config.data_dir).await?);
    info!("Profile Manager initialized");

    // Initialize Media Store
    let media = Arc::new(MediaStore::new(&config.media_dir).await?);
    info!("Media Store initialized");

    let addr = config.bind_addr();

    // Create app state
    let state = AppState {
        config,
        auth,
        profiles,
        media,
    };

    let app = router::router(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http());

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
