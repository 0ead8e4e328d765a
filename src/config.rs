use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use open_tv_core::cache::app_data_dir;
use open_tv_core::player::{expand_home, expand_record_dir, DEFAULT_STARTUP_TIMEOUT};
use open_tv_core::{LauncherOptions, PlayerCommand};

use crate::app_state::DEFAULT_PAGE_SIZE;

const CONFIG_FILE: &str = "open_tv_config.txt";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub player_command: String,   // empty = locate mpv
    pub startup_timeout_secs: u64,
    pub kill_on_timeout: bool,
    pub record_dir: String,       // empty = <videos>/open-tv
    pub data_dir: String,         // empty = per-user data dir
    pub page_size: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            player_command: String::new(),
            startup_timeout_secs: DEFAULT_STARTUP_TIMEOUT.as_secs(),
            kill_on_timeout: false,
            record_dir: String::new(),
            data_dir: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Apply one `key=value` pair. Unknown keys return `false`; bad values
    /// fall back to the default for that key.
    pub fn apply(&mut self, key: &str, value: &str) -> bool {
        let v = value.trim();
        let d = Config::default();
        match key.trim() {
            "player_command" => self.player_command = v.to_string(),
            "startup_timeout_secs" => {
                self.startup_timeout_secs = v.parse::<u64>().ok().filter(|n| *n > 0).unwrap_or(d.startup_timeout_secs)
            }
            "kill_on_timeout" => self.kill_on_timeout = v.parse::<u8>().map(|n| n != 0).unwrap_or(d.kill_on_timeout),
            "record_dir" => self.record_dir = v.to_string(),
            "data_dir" => self.data_dir = v.to_string(),
            "page_size" => self.page_size = v.parse::<usize>().ok().filter(|n| *n > 0).unwrap_or(d.page_size),
            "log_level" => self.log_level = if v.is_empty() { d.log_level } else { v.to_string() },
            _ => return false,
        }
        true
    }

    /// Set a key from the command line; unknown keys are an error here.
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        if !self.apply(key, value) {
            bail!("unknown setting '{}'", key);
        }
        Ok(())
    }

    pub fn data_dir(&self) -> anyhow::Result<PathBuf> {
        let raw = self.data_dir.trim();
        if raw.is_empty() {
            return app_data_dir().context("locating the application data directory");
        }
        Ok(expand_home(raw))
    }

    pub fn launcher_options(&self) -> LauncherOptions {
        LauncherOptions {
            command: PlayerCommand::parse(&self.player_command).unwrap_or_else(PlayerCommand::resolve),
            startup_timeout: Duration::from_secs(self.startup_timeout_secs),
            kill_on_timeout: self.kill_on_timeout,
            record_dir: expand_record_dir(&self.record_dir),
        }
    }
}

pub fn parse_config(content: &str) -> Config {
    let mut cfg = Config::default();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            cfg.apply(k, v);
        }
    }
    cfg
}

pub fn render_config(cfg: &Config) -> String {
    let mut out = String::new();
    if !cfg.player_command.is_empty() { out.push_str(&format!("player_command={}\n", cfg.player_command)); }
    out.push_str(&format!("startup_timeout_secs={}\n", cfg.startup_timeout_secs));
    out.push_str(&format!("kill_on_timeout={}\n", if cfg.kill_on_timeout { 1 } else { 0 }));
    if !cfg.record_dir.is_empty() { out.push_str(&format!("record_dir={}\n", cfg.record_dir)); }
    if !cfg.data_dir.is_empty() { out.push_str(&format!("data_dir={}\n", cfg.data_dir)); }
    out.push_str(&format!("page_size={}\n", cfg.page_size));
    out.push_str(&format!("log_level={}\n", cfg.log_level));
    out
}

/// The config file lives in `data_dir` when one is given on the command
/// line, otherwise in the per-user application data directory.
pub fn config_file_path(data_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    match data_dir {
        Some(dir) => Ok(dir.join(CONFIG_FILE)),
        None => Ok(app_data_dir()?.join(CONFIG_FILE)),
    }
}

/// Settings from the config file; defaults when it does not exist.
pub fn read_config(path: &Path) -> anyhow::Result<Config> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(parse_config(&content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

pub fn save_config(path: &Path, cfg: &Config) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut f = fs::File::create(path).with_context(|| format!("writing {}", path.display()))?;
    f.write_all(render_config(cfg).as_bytes())?;
    Ok(())
}
