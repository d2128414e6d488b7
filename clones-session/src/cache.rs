//! Persistence of the "last wallet provider used" marker.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use clones_core::error::Result;
use clones_core::traits::ProviderCache;

/// Marker kept in memory; lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryProviderCache {
    provider: RwLock<Option<String>>,
}

impl MemoryProviderCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProviderCache for MemoryProviderCache {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.provider.read().clone())
    }

    async fn store(&self, provider_id: &str) -> Result<()> {
        *self.provider.write() = Some(provider_id.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.provider.write() = None;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct Marker {
    provider: String,
}

/// Marker stored as a small JSON file.
///
/// # File Format
///
/// ```text
/// {"provider": "<provider id>"}
/// ```
///
/// A missing file means no marker.
#[derive(Debug, Clone)]
pub struct FileProviderCache {
    path: PathBuf,
}

impl FileProviderCache {
    /// Creates a cache backed by `path`; the file is created on first store.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ProviderCache for FileProviderCache {
    #[instrument(skip(self), fields(path = ?self.path))]
    async fn load(&self) -> Result<Option<String>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let marker: Marker = serde_json::from_str(&contents)?;
        debug!(provider = %marker.provider, "Loaded provider marker");
        Ok(Some(marker.provider))
    }

    #[instrument(skip(self), fields(path = ?self.path))]
    async fn store(&self, provider_id: &str) -> Result<()> {
        let contents = serde_json::to_vec(&Marker {
            provider: provider_id.to_string(),
        })?;

        // Write to temp, then rename
        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&contents).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, &self.path).await?;

        debug!("Provider marker saved");
        Ok(())
    }

    #[instrument(skip(self), fields(path = ?self.path))]
    async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_memory_cache() {
        let cache = MemoryProviderCache::new();
        assert!(cache.load().await.unwrap().is_none());

        cache.store("injected").await.unwrap();
        assert_eq!(cache.load().await.unwrap().as_deref(), Some("injected"));

        cache.clear().await.unwrap();
        assert!(cache.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_cache_missing_file() {
        let dir = tempdir().unwrap();
        let cache = FileProviderCache::new(dir.path().join("provider.json"));

        assert!(cache.load().await.unwrap().is_none());
        // Clearing a marker that was never written is fine
        cache.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_cache_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("provider.json");

        FileProviderCache::new(&path).store("injected").await.unwrap();

        let reopened = FileProviderCache::new(&path);
        assert_eq!(reopened.load().await.unwrap().as_deref(), Some("injected"));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, r#"{"provider":"injected"}"#);

        reopened.clear().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_file_cache_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("provider.json");
        fs::write(&path, b"not json").await.unwrap();

        assert!(FileProviderCache::new(&path).load().await.is_err());
    }
}
