//! On-disk channel cache and favorites.
//!
//! Two JSON documents live in the application data directory: `cache.json`
//! with the last parsed playlist and `favs.json` with the user's favorites.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::models::{CachedState, Channel, PlaylistSource};

pub const APP_DIR_NAME: &str = "open-tv";
const CACHE_FILE: &str = "cache.json";
const FAVS_FILE: &str = "favs.json";

/// Per-user data directory of the application.
///
/// `%APPDATA%\open-tv` on Windows, `~/Library/Application Support/open-tv` on
/// macOS and `~/.local/share/open-tv` (or `$XDG_DATA_HOME`) elsewhere.
pub fn app_data_dir() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.data_dir().join(APP_DIR_NAME))
        .ok_or(CoreError::NoDataDir)
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn cache_path(&self) -> PathBuf {
        self.dir.join(CACHE_FILE)
    }

    pub fn favorites_path(&self) -> PathBuf {
        self.dir.join(FAVS_FILE)
    }

    /// Replace the cached playlist.
    pub async fn save(&self, channels: &[Channel], source_url: Option<&str>) -> Result<()> {
        let source = PlaylistSource {
            channels: channels.to_vec(),
            source_url: source_url.map(str::to_string),
        };
        self.write_json(&self.cache_path(), &source).await?;
        info!(
            "cached {} channels (source: {})",
            channels.len(),
            source_url.unwrap_or("local file")
        );
        Ok(())
    }

    /// Load the cached playlist and favorites.
    ///
    /// A missing cache document is not an error; it yields an empty state.
    pub async fn load(&self) -> Result<CachedState> {
        let Some(cache) = self.read_json::<PlaylistSource>(&self.cache_path()).await? else {
            debug!("no cache document at {}", self.cache_path().display());
            return Ok(CachedState::default());
        };
        let favorites = self
            .read_json::<Vec<Channel>>(&self.favorites_path())
            .await?
            .unwrap_or_default();
        Ok(CachedState {
            cache: Some(cache),
            favorites,
        })
    }

    pub async fn save_favorites(&self, favorites: &[Channel]) -> Result<()> {
        self.write_json(&self.favorites_path(), &favorites).await?;
        debug!("saved {} favorites", favorites.len());
        Ok(())
    }

    /// Delete both documents. Files that are already gone are skipped.
    pub async fn clear(&self) -> Result<()> {
        remove_if_exists(&self.cache_path()).await?;
        remove_if_exists(&self.favorites_path()).await?;
        info!("cleared channel cache in {}", self.dir.display());
        Ok(())
    }

    async fn write_json<T: Serialize + ?Sized>(&self, path: &Path, data: &T) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CoreError::io(&self.dir, e))?;
        let json = serde_json::to_string(data)?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| CoreError::io(path, e))
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        match tokio::fs::read_to_string(path).await {
            Ok(s) => Ok(Some(serde_json::from_str(&s)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::io(path, e)),
        }
    }
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CoreError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(name: &str) -> Channel {
        Channel {
            name: name.into(),
            image: None,
            group: None,
            url: format!("http://x/{}", name),
        }
    }

    #[tokio::test]
    async fn creates_missing_directory_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path().join("nested").join("open-tv"));
        store.save(&[channel("a")], None).await.unwrap();
        assert!(store.cache_path().exists());
    }

    #[tokio::test]
    async fn legacy_source_url_key_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        std::fs::write(
            store.cache_path(),
            r#"{"channels":[{"name":"a","url":"http://x/a"}],"sourceUrl":"http://list"}"#,
        )
        .unwrap();
        let state = store.load().await.unwrap();
        let cache = state.cache.unwrap();
        assert_eq!(cache.source_url.as_deref(), Some("http://list"));
        assert_eq!(cache.channels, vec![channel("a")]);
    }

    #[tokio::test]
    async fn corrupt_cache_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::new(dir.path());
        std::fs::write(store.cache_path(), "{not json").unwrap();
        assert!(matches!(store.load().await, Err(CoreError::Json(_))));
    }
}
