//! Error type shared by the core crate.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Reading, writing or deleting a file failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cache document could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No home directory, so no application data directory either.
    #[error("could not determine the application data directory")]
    NoDataDir,

    /// Downloading a remote playlist failed.
    #[error("playlist download failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The player executable could not be started at all.
    #[error("failed to start player '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The player was started but never reported audio or video output.
    #[error("player did not start within {}ms", .timeout.as_millis())]
    StartupTimeout { timeout: Duration },

    /// The player exited before reporting audio or video output.
    #[error("player exited before starting playback (code {code:?})")]
    ProcessExited { code: Option<i32> },
}

impl CoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io { path: path.into(), source }
    }
}
