use open_tv_core::{CacheStore, CachedState, Channel, PlaylistSource};

fn sample() -> Vec<Channel> {
    vec![
        Channel {
            name: "News".into(),
            image: Some("http://logo/news.png".into()),
            group: Some("News".into()),
            url: "http://x/news.m3u8".into(),
        },
        Channel {
            name: "Movies".into(),
            image: None,
            group: None,
            url: "http://x/movies.m3u8".into(),
        },
    ]
}

#[tokio::test]
async fn save_then_load_round_trips() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = CacheStore::new(dir.path().join("open-tv"));

    store.save(&sample(), Some("http://lists/tv.m3u")).await?;
    let state = store.load().await?;

    assert_eq!(
        state,
        CachedState {
            cache: Some(PlaylistSource {
                channels: sample(),
                source_url: Some("http://lists/tv.m3u".into()),
            }),
            favorites: Vec::new(),
        }
    );
    assert!(!state.needs_setup());
    Ok(())
}

#[tokio::test]
async fn new_save_replaces_previous_source() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = CacheStore::new(dir.path());

    store.save(&sample(), Some("http://lists/old.m3u")).await?;
    store.save(&sample()[..1], None).await?;

    let cache = store.load().await?.cache.expect("cache document");
    assert_eq!(cache.channels, sample()[..1].to_vec());
    assert_eq!(cache.source_url, None);
    Ok(())
}

#[tokio::test]
async fn missing_cache_means_first_run() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = CacheStore::new(dir.path().join("never-created"));

    let state = store.load().await?;
    assert_eq!(state, CachedState::default());
    assert!(state.needs_setup());
    Ok(())
}

#[tokio::test]
async fn favorites_are_written_verbatim() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = CacheStore::new(dir.path());
    let favs = sample();

    store.save_favorites(&favs).await?;
    let raw = std::fs::read_to_string(store.favorites_path())?;
    let read_back: Vec<Channel> = serde_json::from_str(&raw)?;
    assert_eq!(read_back, favs);

    store.save(&sample(), None).await?;
    assert_eq!(store.load().await?.favorites, favs);
    Ok(())
}

#[tokio::test]
async fn clear_is_idempotent() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = CacheStore::new(dir.path());

    store.clear().await?;

    store.save(&sample(), None).await?;
    store.save_favorites(&sample()).await?;
    store.clear().await?;

    assert!(!store.cache_path().exists());
    assert!(!store.favorites_path().exists());
    assert_eq!(store.load().await?, CachedState::default());

    store.clear().await?;
    Ok(())
}
