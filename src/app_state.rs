use open_tv_core::{CachedState, Channel};

use crate::search::{filter_channels, groups};

pub const DEFAULT_PAGE_SIZE: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    All,
    Favorites,
}

/// What the user currently browses: the cached channels, favorites and the
/// active search/paging.
#[derive(Debug, Clone)]
pub struct BrowseState {
    pub channels: Vec<Channel>,
    pub favorites: Vec<Channel>,
    pub source_url: Option<String>,
    pub view_mode: ViewMode,
    page_size: usize,
    elements_to_retrieve: usize,
    term: String,
    group: Option<String>,
}

impl BrowseState {
    pub fn new(state: CachedState, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let (channels, source_url) = match state.cache {
            Some(cache) => (cache.channels, cache.source_url),
            None => (Vec::new(), None),
        };
        Self {
            channels,
            favorites: state.favorites,
            source_url,
            view_mode: ViewMode::All,
            page_size,
            elements_to_retrieve: page_size,
            term: String::new(),
            group: None,
        }
    }

    /// New search term; paging starts over.
    pub fn search(&mut self, term: &str) {
        self.term = term.to_string();
        self.elements_to_retrieve = self.page_size;
    }

    pub fn set_group(&mut self, group: Option<String>) {
        self.group = group;
        self.elements_to_retrieve = self.page_size;
    }

    pub fn load_more(&mut self) {
        self.elements_to_retrieve += self.page_size;
    }

    fn matching(&self) -> Vec<&Channel> {
        match self.view_mode {
            ViewMode::All => filter_channels(&self.channels, &self.term, self.group.as_deref()),
            ViewMode::Favorites => filter_channels(&self.favorites, &self.term, self.group.as_deref()),
        }
    }

    /// Channels to show. The favorites view is never paged.
    pub fn visible(&self) -> Vec<&Channel> {
        let mut found = self.matching();
        if self.view_mode == ViewMode::All {
            found.truncate(self.elements_to_retrieve);
        }
        found
    }

    /// How many more matches `load_more` could reveal.
    pub fn channels_left(&self) -> usize {
        match self.view_mode {
            ViewMode::All => self.matching().len().saturating_sub(self.elements_to_retrieve),
            ViewMode::Favorites => 0,
        }
    }

    /// Where the cached channels came from.
    pub fn source_label(&self) -> &str {
        self.source_url.as_deref().unwrap_or("local file")
    }

    pub fn groups(&self) -> Vec<&str> {
        groups(&self.channels)
    }

    pub fn is_favorite(&self, channel: &Channel) -> bool {
        self.favorites.iter().any(|f| f.same_as(channel))
    }

    /// Add or remove a favorite; returns whether it is a favorite afterwards.
    pub fn toggle_favorite(&mut self, channel: &Channel) -> bool {
        if let Some(pos) = self.favorites.iter().position(|f| f.same_as(channel)) {
            self.favorites.remove(pos);
            false
        } else {
            self.favorites.push(channel.clone());
            true
        }
    }

    /// Look a channel up by exact (case-insensitive) name, channels first.
    pub fn find(&self, name: &str) -> Option<&Channel> {
        let name = name.trim();
        self.channels
            .iter()
            .chain(self.favorites.iter())
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}
