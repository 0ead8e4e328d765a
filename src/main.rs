//! open-tv: browse, play and record IPTV channels from an M3U playlist.

mod app_state;
mod config;
mod logger;
mod search;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use open_tv_core::{CacheStore, Channel, CoreError, OpenTv};
use tracing::{info, warn};

use app_state::{BrowseState, ViewMode};
use config::{config_file_path, read_config, render_config, save_config};

#[derive(Parser, Debug)]
#[command(name = "open-tv", version, about = "IPTV front-end for M3U playlists and mpv")]
struct Cli {
    /// Use this directory for the channel cache and favorites
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a local playlist file and cache it
    LoadFile { path: PathBuf },
    /// Download a playlist and cache it
    LoadUrl { url: String },
    /// List cached channels
    List {
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(short, long)]
        group: Option<String>,
        /// Show favorites instead of all channels
        #[arg(short, long)]
        favorites: bool,
        #[arg(short, long, default_value_t = 1)]
        page: usize,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List channel groups
    Groups,
    /// Play a channel by name, or a stream url directly
    Play {
        target: String,
        /// Record the stream to the recordings directory
        #[arg(short, long)]
        record: bool,
    },
    /// Add or remove a favorite
    Fav { name: String },
    /// Delete the cached playlist and favorites
    Clear,
    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = config_file_path(cli.data_dir.as_deref())?;
    let mut cfg = read_config(&config_path)?;
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => cfg.data_dir()?,
    };
    let log_file = logger::log_path(&data_dir);
    if let Err(e) = logger::init(&cfg.log_level, Some(log_file.as_path())) {
        eprintln!("logging disabled: {}", e);
    }

    let app = OpenTv::new(CacheStore::new(&data_dir), cfg.launcher_options());

    match cli.command {
        Command::LoadFile { path } => load_file(&app, &path).await,
        Command::LoadUrl { url } => load_url(&app, &url).await,
        Command::List { search, group, favorites, page, json } => {
            let mut state = browse(&app, cfg.page_size).await?;
            if favorites {
                state.view_mode = ViewMode::Favorites;
            }
            state.search(&search);
            state.set_group(group);
            for _ in 1..page.max(1) {
                state.load_more();
            }
            print_channels(&state, json)
        }
        Command::Groups => {
            let state = browse(&app, cfg.page_size).await?;
            for group in state.groups() {
                println!("{}", group);
            }
            Ok(())
        }
        Command::Play { target, record } => play(&app, cfg.page_size, &target, record).await,
        Command::Fav { name } => toggle_favorite(&app, cfg.page_size, &name).await,
        Command::Clear => {
            app.delete_cache().await.context("deleting the channel cache")?;
            println!("Cache cleared.");
            Ok(())
        }
        Command::Config { action: None } => {
            print!("{}", render_config(&cfg));
            Ok(())
        }
        Command::Config { action: Some(ConfigAction::Set { key, value }) } => {
            cfg.set(&key, &value)?;
            save_config(&config_path, &cfg)?;
            println!("{}={}", key, value.trim());
            Ok(())
        }
    }
}

async fn load_file(app: &OpenTv, path: &Path) -> anyhow::Result<()> {
    let channels = app
        .select_and_parse_file(path)
        .await
        .with_context(|| format!("loading {}", path.display()))?;
    println!("Loaded {} channels from {}", channels.len(), path.display());
    Ok(())
}

async fn load_url(app: &OpenTv, raw: &str) -> anyhow::Result<()> {
    let url = url::Url::parse(raw.trim()).with_context(|| format!("'{}' is not a valid url", raw))?;
    let channels = app.download_and_parse_url(url.as_str()).await?;
    if channels.is_empty() {
        // Download errors and empty playlists both end up here.
        bail!("no channels could be loaded from {}", url);
    }
    println!("Loaded {} channels from {}", channels.len(), url);
    Ok(())
}

async fn browse(app: &OpenTv, page_size: usize) -> anyhow::Result<BrowseState> {
    let cached = app.get_cached_state().await.context("reading the channel cache")?;
    if cached.needs_setup() {
        bail!("no playlist loaded yet; run `open-tv load-file <path>` or `open-tv load-url <url>` first");
    }
    Ok(BrowseState::new(cached, page_size))
}

fn print_channels(state: &BrowseState, json: bool) -> anyhow::Result<()> {
    let visible = state.visible();
    if json {
        println!("{}", serde_json::to_string_pretty(&visible)?);
        return Ok(());
    }
    for channel in &visible {
        let star = if state.is_favorite(channel) { "*" } else { " " };
        println!(
            "{} {}\t{}\t{}",
            star,
            channel.name,
            channel.group.as_deref().unwrap_or("-"),
            channel.url
        );
    }
    let left = state.channels_left();
    if left > 0 {
        println!("... {} more (use --page)", left);
    }
    println!("Source: {}", state.source_label());
    Ok(())
}

fn looks_like_stream(target: &str) -> bool {
    target.contains("://") || Path::new(target).exists()
}

async fn play(app: &OpenTv, page_size: usize, target: &str, record: bool) -> anyhow::Result<()> {
    let url = if looks_like_stream(target) {
        target.to_string()
    } else {
        let state = browse(app, page_size).await?;
        match state.find(target) {
            Some(channel) => channel.url.clone(),
            None => bail!("no channel named '{}'", target),
        }
    };

    match app.play_channel(&url, record).await {
        Ok(()) => {}
        Err(CoreError::StartupTimeout { timeout }) => {
            app.stop_playback().await;
            bail!("the player did not start within {}s", timeout.as_secs());
        }
        Err(e) => return Err(e).context("starting the player"),
    }
    match app.now_playing().await {
        Some(now) if now.recording => println!("Recording {} (pid {:?})", now.url, now.pid),
        Some(now) => println!("Playing {} (pid {:?})", now.url, now.pid),
        None => {}
    }

    // Stay attached so the player's output pipes remain open.
    tokio::select! {
        status = app.wait_for_player() => {
            if let Some(status) = status {
                info!("player finished: {}", status);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, stopping player");
            app.stop_playback().await;
        }
    }
    Ok(())
}

async fn toggle_favorite(app: &OpenTv, page_size: usize, name: &str) -> anyhow::Result<()> {
    let mut state = browse(app, page_size).await?;
    let channel: Channel = match state.find(name) {
        Some(channel) => channel.clone(),
        None => bail!("no channel named '{}'", name),
    };
    let now_favorite = state.toggle_favorite(&channel);
    app.save_favorites(&state.favorites).await.context("saving favorites")?;
    if now_favorite {
        println!("Added {} to favorites", channel.name);
    } else {
        println!("Removed {} from favorites", channel.name);
    }
    Ok(())
}
