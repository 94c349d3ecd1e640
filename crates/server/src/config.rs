//! Profile server configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::AuthManager;
use crate::profile::store::ProfileManager;
use media_store::MediaStore;

/// Configuration for the Customer Profile Server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Directory holding the SQLite database
    pub data_dir: PathBuf,
    /// Public media root, served under /storage
    pub media_dir: PathBuf,
    /// Port to listen on
    pub port: u16,
    /// Max accepted profile image size in KiB
    pub max_image_kib: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let data_dir = std::env::var("PROFILE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("profile_data"));
        Self {
            media_dir: data_dir.join("public"),
            data_dir,
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            max_image_kib: 2048,
        }
    }
}

impl ServerConfig {
    /// Create config with custom base directory
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        let base = base_dir.into();
        config.media_dir = base.join("public");
        config.data_dir = base;
        config
    }

    /// Ensure all directories exist
    pub async fn ensure_dirs(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        tokio::fs::create_dir_all(&self.media_dir).await?;
        Ok(())
    }

    /// Socket address to bind
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// Request body cap: the image cap plus headroom for the text fields.
    pub fn body_limit(&self) -> usize {
        self.max_image_kib * 1024 + 1024 * 1024
    }
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub auth: Arc<AuthManager>,
    pub profiles: Arc<ProfileManager>,
    pub media: Arc<MediaStore>,
}
