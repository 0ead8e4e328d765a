//! External player (mpv) launcher.
//!
//! Only one player session exists at a time. Starting a new one kills the
//! previous process first, and `play` only succeeds once the new process
//! reports audio or video output.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, trace, warn};

use crate::cache::APP_DIR_NAME;
use crate::error::{CoreError, Result};
use crate::models::NowPlaying;

pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// mpv prints these prefixes once audio/video output is configured.
const STARTUP_MARKERS: [&str; 3] = ["AO", "VO", "AV"];
/// Local video containers resume where they stopped instead of recording.
const RESUME_EXTENSIONS: [&str; 2] = [".mp4", ".mkv"];

/// Player executable plus any arguments that go before the stream url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl PlayerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Split a user supplied command line; `None` when it is blank.
    pub fn parse(cmd: &str) -> Option<Self> {
        let mut parts = cmd.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program: PathBuf::from(program),
            args: parts.collect(),
        })
    }

    /// Locate mpv for the current platform.
    pub fn resolve() -> Self {
        Self::new(resolve_mpv())
    }
}

#[cfg(target_os = "windows")]
fn resolve_mpv() -> PathBuf {
    if find_on_path("mpv.exe").is_some() {
        return PathBuf::from("mpv");
    }
    // Installers ship mpv under `libs` next to the executable.
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("libs").join("mpv.exe")))
        .filter(|p| p.exists())
        .unwrap_or_else(|| PathBuf::from("mpv"))
}

#[cfg(target_os = "macos")]
fn resolve_mpv() -> PathBuf {
    ["/opt/homebrew/bin/mpv", "/opt/local/bin/mpv"]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .unwrap_or_else(|| PathBuf::from("mpv"))
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn resolve_mpv() -> PathBuf {
    PathBuf::from("mpv")
}

#[cfg(target_os = "windows")]
fn find_on_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|p| p.is_file())
}

/// Default recordings directory: the user's videos folder plus `open-tv`.
pub fn default_record_dir() -> PathBuf {
    if let Some(ud) = directories::UserDirs::new() {
        if let Some(videos) = ud.video_dir() {
            return videos.join(APP_DIR_NAME);
        }
        let folder = if cfg!(target_os = "macos") { "Movies" } else { "Videos" };
        return ud.home_dir().join(folder).join(APP_DIR_NAME);
    }
    std::env::temp_dir().join("open-tv-recordings")
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(ud) = directories::UserDirs::new() {
            return ud.home_dir().join(rest);
        }
    }
    PathBuf::from(raw)
}

/// Configured recordings directory, blank meaning the default one.
pub fn expand_record_dir(raw: &str) -> PathBuf {
    if raw.trim().is_empty() {
        return default_record_dir();
    }
    expand_home(raw)
}

/// `YYYY-MM-HH-MM.mp4`, stable within the same minute.
pub fn recording_file_name(now: &DateTime<Local>) -> String {
    now.format("%Y-%m-%H-%M.mp4").to_string()
}

pub fn resumes_position(url: &str) -> bool {
    let url = url.trim().to_ascii_lowercase();
    RESUME_EXTENSIONS.iter().any(|ext| url.ends_with(ext))
}

/// Arguments following the player program (and its own leading args).
///
/// `record_to` is ignored for local video files, which resume instead.
pub fn build_args(url: &str, record_to: Option<&Path>) -> Vec<String> {
    let mut args = vec![url.to_string(), "--fs".to_string()];
    if resumes_position(url) {
        args.push("--save-position-on-quit".to_string());
    } else if let Some(path) = record_to {
        args.push(format!("--stream-record={}", path.display()));
    }
    args
}

fn is_startup_line(line: &str) -> bool {
    STARTUP_MARKERS.iter().any(|m| line.contains(m))
}

#[derive(Debug, Clone)]
pub struct LauncherOptions {
    pub command: PlayerCommand,
    pub startup_timeout: Duration,
    /// Kill the player when it does not confirm startup in time.
    pub kill_on_timeout: bool,
    pub record_dir: PathBuf,
}

impl Default for LauncherOptions {
    fn default() -> Self {
        Self {
            command: PlayerCommand::resolve(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            kill_on_timeout: false,
            record_dir: default_record_dir(),
        }
    }
}

#[derive(Debug)]
struct Session {
    child: Child,
    url: String,
    recording: bool,
    confirmed: bool,
}

impl Session {
    async fn terminate(mut self) {
        let pid = self.child.id();
        // Fails when the process already exited; reaping below still applies.
        let _ = self.child.start_kill();
        match self.child.wait().await {
            Ok(status) => debug!("player pid={:?} stopped ({})", pid, status),
            Err(e) => warn!("failed to reap player pid={:?}: {}", pid, e),
        }
    }
}

/// Owns the single player session.
#[derive(Debug)]
pub struct Launcher {
    options: LauncherOptions,
    session: Mutex<Option<Session>>,
}

impl Launcher {
    pub fn new(options: LauncherOptions) -> Self {
        Self {
            options,
            session: Mutex::new(None),
        }
    }

    /// Start the player for `url`, replacing any current session.
    ///
    /// The session lock is held until startup is confirmed or fails, so
    /// concurrent calls run one after another.
    pub async fn play(&self, url: &str, record: bool) -> Result<()> {
        let mut slot = self.session.lock().await;
        if let Some(previous) = slot.take() {
            info!("stopping previous player for {}", previous.url);
            previous.terminate().await;
        }

        let record_to = if record && !resumes_position(url) {
            Some(self.prepare_recording().await?)
        } else {
            None
        };
        let args = build_args(url, record_to.as_deref());
        let program = &self.options.command.program;
        info!(
            "RUN: {} {} {}",
            program.display(),
            self.options.command.args.join(" "),
            args.join(" ")
        );

        let mut child = Command::new(program)
            .args(&self.options.command.args)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CoreError::Spawn {
                program: program.display().to_string(),
                source,
            })?;
        info!("spawned player pid={:?}", child.id());

        let outcome = wait_for_startup(&mut child, self.options.startup_timeout).await;
        let session = Session {
            child,
            url: url.to_string(),
            recording: record_to.is_some(),
            confirmed: outcome.is_ok(),
        };
        match &outcome {
            Ok(()) => info!("playback started for {}", url),
            Err(e) => warn!("playback of {} failed: {}", url, e),
        }
        if matches!(outcome, Err(CoreError::StartupTimeout { .. })) && self.options.kill_on_timeout {
            session.terminate().await;
        } else {
            *slot = Some(session);
        }
        outcome
    }

    /// Kill the current player, if any.
    pub async fn stop(&self) {
        if let Some(session) = self.session.lock().await.take() {
            info!("stopping player for {}", session.url);
            session.terminate().await;
        }
    }

    /// Wait until the tracked player exits on its own.
    ///
    /// Returns `None` right away when nothing is tracked. The lock is only
    /// taken while polling, so `stop` and `play` stay usable meanwhile.
    pub async fn wait_for_exit(&self) -> Option<ExitStatus> {
        loop {
            {
                let mut slot = self.session.lock().await;
                let session = slot.as_mut()?;
                match session.child.try_wait() {
                    Ok(Some(status)) => {
                        info!("player for {} exited ({})", session.url, status);
                        slot.take();
                        return Some(status);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("lost track of player for {}: {}", session.url, e);
                        slot.take();
                        return None;
                    }
                }
            }
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }
    }

    /// The confirmed session, if one is running.
    pub async fn now_playing(&self) -> Option<NowPlaying> {
        let slot = self.session.lock().await;
        slot.as_ref().filter(|s| s.confirmed).map(|s| NowPlaying {
            url: s.url.clone(),
            recording: s.recording,
            pid: s.child.id(),
        })
    }

    /// Pid of the tracked process, confirmed or not.
    pub async fn tracked_pid(&self) -> Option<u32> {
        self.session.lock().await.as_ref().and_then(|s| s.child.id())
    }

    async fn prepare_recording(&self) -> Result<PathBuf> {
        let dir = &self.options.record_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| CoreError::io(dir, e))?;
        Ok(dir.join(recording_file_name(&Local::now())))
    }
}

/// Resolve once the player prints a startup marker.
///
/// Checked in order on every wake-up: output, process exit, timeout. Once the
/// process has exited, the output it left in the pipes is still read before
/// the exit is reported.
async fn wait_for_startup(child: &mut Child, timeout: Duration) -> Result<()> {
    let (tx, mut rx) = mpsc::channel::<String>(64);
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_output(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_output(stderr, tx.clone()));
    }
    drop(tx);

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);
    let mut output_open = true;
    let mut exited: Option<Option<i32>> = None;
    loop {
        tokio::select! {
            biased;
            line = rx.recv(), if output_open => match line {
                Some(line) if is_startup_line(&line) => return Ok(()),
                Some(line) => trace!("player: {}", line),
                None => {
                    output_open = false;
                    if let Some(code) = exited {
                        return Err(CoreError::ProcessExited { code });
                    }
                }
            },
            status = child.wait(), if exited.is_none() => {
                let code = status.ok().and_then(|s| s.code());
                if !output_open {
                    return Err(CoreError::ProcessExited { code });
                }
                debug!("player exited ({:?}), reading remaining output", code);
                exited = Some(code);
            }
            _ = &mut deadline => {
                // Pipes may outlive the child when a grandchild inherited them.
                return Err(match exited {
                    Some(code) => CoreError::ProcessExited { code },
                    None => CoreError::StartupTimeout { timeout },
                });
            }
        }
    }
}

/// Forward output lines until nobody listens, then keep draining the pipe so
/// the player never blocks on a full buffer.
async fn forward_output<R: AsyncRead + Unpin>(reader: R, tx: mpsc::Sender<String>) {
    let mut reader = BufReader::new(reader);
    let mut tx = Some(tx);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let line = String::from_utf8_lossy(&buf).trim_end().to_string();
        match &tx {
            Some(sender) => {
                if sender.send(line).await.is_err() {
                    tx = None;
                }
            }
            None => trace!("player: {}", line),
        }
    }
}
