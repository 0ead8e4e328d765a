use serde::{Deserialize, Serialize};

/// A playable entry of a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub url: String,
}

impl Channel {
    /// Favorites are matched by name and stream url, nothing else.
    pub fn same_as(&self, other: &Channel) -> bool {
        self.name == other.name && self.url == other.url
    }
}

/// The last successfully parsed playlist, as written to `cache.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSource {
    pub channels: Vec<Channel>,
    // Key kept as `url` so cache files written by earlier open-tv releases still load.
    #[serde(rename = "url", alias = "sourceUrl", default)]
    pub source_url: Option<String>,
}

/// Everything the UI needs on startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedState {
    pub cache: Option<PlaylistSource>,
    #[serde(default)]
    pub favorites: Vec<Channel>,
}

impl CachedState {
    /// No cached channels: the UI has to run first-time setup.
    pub fn needs_setup(&self) -> bool {
        self.cache.as_ref().map_or(true, |c| c.channels.is_empty())
    }
}

/// Public view of the current player session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub url: String,
    pub recording: bool,
    pub pid: Option<u32>,
}
