mod api;
pub mod cache;
pub mod error;
mod models;
pub mod parser;
pub mod player;

pub use api::fetch_playlist;
pub use cache::CacheStore;
pub use error::{CoreError, Result};
pub use models::*;
pub use player::{Launcher, LauncherOptions, PlayerCommand};

use std::path::Path;

use tracing::warn;

/// The operations offered to the user interface.
#[derive(Debug)]
pub struct OpenTv {
    store: CacheStore,
    launcher: Launcher,
    http: reqwest::Client,
}

impl OpenTv {
    pub fn new(store: CacheStore, options: LauncherOptions) -> Self {
        Self {
            store,
            launcher: Launcher::new(options),
            http: reqwest::Client::new(),
        }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Parse a playlist file chosen by the user and make it the cached source.
    pub async fn select_and_parse_file(&self, path: impl AsRef<Path>) -> Result<Vec<Channel>> {
        let channels = parser::parse_playlist_file(path).await?;
        self.store.save(&channels, None).await?;
        Ok(channels)
    }

    /// Download a playlist and make it the cached source.
    ///
    /// Download failures give an empty list and leave the cache untouched.
    pub async fn download_and_parse_url(&self, url: &str) -> Result<Vec<Channel>> {
        let channels = match fetch_playlist(&self.http, url).await {
            Ok(channels) => channels,
            Err(e) => {
                warn!("could not load playlist from {}: {}", url, e);
                return Ok(Vec::new());
            }
        };
        self.store.save(&channels, Some(url)).await?;
        Ok(channels)
    }

    pub async fn get_cached_state(&self) -> Result<CachedState> {
        self.store.load().await
    }

    pub async fn save_favorites(&self, favorites: &[Channel]) -> Result<()> {
        self.store.save_favorites(favorites).await
    }

    pub async fn delete_cache(&self) -> Result<()> {
        self.store.clear().await
    }

    pub async fn play_channel(&self, url: &str, record: bool) -> Result<()> {
        self.launcher.play(url, record).await
    }

    pub async fn stop_playback(&self) {
        self.launcher.stop().await
    }

    /// Block until the current player exits by itself.
    pub async fn wait_for_player(&self) -> Option<std::process::ExitStatus> {
        self.launcher.wait_for_exit().await
    }

    pub async fn now_playing(&self) -> Option<NowPlaying> {
        self.launcher.now_playing().await
    }
}
