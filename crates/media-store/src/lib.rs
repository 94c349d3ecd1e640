//! Public media storage for user-uploaded file artifacts.
//!
//! Artifacts are written under a single root directory as
//! `<namespace>/<random>.<ext>` and referenced everywhere else by that
//! storage-relative path. The root is expected to be exposed as
//! public-readable static content by whoever embeds the store.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

/// Errors raised by [`MediaStore`] operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid media path: {0}")]
    InvalidPath(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// File store rooted at a public content directory.
///
/// Paths handed out and accepted by the store are always relative to the
/// root; callers never see absolute filesystem paths.
#[derive(Clone, Debug)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Store `data` under `namespace` and return the storage-relative path.
    ///
    /// Every call picks a fresh random filename, so storing the same bytes
    /// twice yields two distinct paths.
    pub async fn store(&self, namespace: &str, ext: &str, data: &[u8]) -> Result<String> {
        let rel = format!("{}/{}.{}", namespace, Uuid::new_v4(), ext);
        let dest = self.resolve(&rel)?;

        atomic_write(&dest, data, &self.root.join("tmp")).await?;

        info!("[Media] Stored {} ({} bytes)", rel, data.len());
        Ok(rel)
    }

    /// Read an artifact back, or `None` if nothing is stored at `rel`.
    pub async fn read(&self, rel: &str) -> Result<Option<Bytes>> {
        let path = self.resolve(rel)?;
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        let data = fs::read(&path).await?;
        Ok(Some(Bytes::from(data)))
    }

    /// Whether an artifact exists at `rel`.
    pub async fn exists(&self, rel: &str) -> Result<bool> {
        let path = self.resolve(rel)?;
        Ok(fs::try_exists(&path).await?)
    }

    /// Delete the artifact at `rel`. Deleting a missing path is not an error.
    pub async fn delete(&self, rel: &str) -> Result<()> {
        let path = self.resolve(rel)?;
        if fs::try_exists(&path).await? {
            fs::remove_file(&path).await?;
            info!("[Media] Deleted {}", rel);
        } else {
            debug!("[Media] Delete skipped, {} not present", rel);
        }
        Ok(())
    }

    /// Map a storage-relative path onto the root.
    ///
    /// Serving routes pass client-controlled paths here, so anything that
    /// could escape the root (absolute paths, `..`, drive prefixes) is
    /// rejected.
    fn resolve(&self, rel: &str) -> Result<PathBuf> {
        let candidate = Path::new(rel);
        if candidate.is_absolute() {
            return Err(Error::InvalidPath(rel.to_string()));
        }
        for component in candidate.components() {
            match component {
                Component::Normal(_) => {}
                _ => return Err(Error::InvalidPath(rel.to_string())),
            }
        }
        Ok(self.root.join(candidate))
    }
}

/// Write `data` to a temp file in `temp_folder`, then rename into place.
pub async fn atomic_write(dest: &Path, data: &[u8], temp_folder: &Path) -> Result<()> {
    fs::create_dir_all(temp_folder).await?;

    let temp_path = temp_folder.join(format!("tmp_{}", Uuid::new_v4()));
    fs::write(&temp_path, data).await?;

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    fs::rename(&temp_path, dest).await?;
    Ok(())
}
