//! M3U playlist parser.
//!
//! Playlists are read as a header line followed by strict two-line records:
//! an `#EXTINF` metadata line and the stream url. The same pairing logic backs
//! both the streaming file reader and the in-memory parser.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::models::Channel;

static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?P<key>tvg-id|tvg-name|tvg-logo|group-title)\s*=\s*"(?P<value>[^"]*)""#)
        .expect("attribute pattern")
});

/// Attributes carried by an `#EXTINF` line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtInf {
    pub id: Option<String>,
    pub name: Option<String>,
    pub logo: Option<String>,
    pub group: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtInfError {
    #[error("line is not an #EXTINF entry")]
    MissingTag,
}

/// Extract the known attributes from a metadata line.
///
/// Blank values count as absent and the first occurrence of a key wins.
pub fn parse_extinf(line: &str) -> std::result::Result<ExtInf, ExtInfError> {
    let body = line
        .trim_start()
        .strip_prefix("#EXTINF:")
        .ok_or(ExtInfError::MissingTag)?;

    let mut info = ExtInf::default();
    for caps in ATTR_RE.captures_iter(body) {
        let value = caps["value"].trim();
        if value.is_empty() {
            continue;
        }
        let slot = match &caps["key"] {
            "tvg-id" => &mut info.id,
            "tvg-name" => &mut info.name,
            "tvg-logo" => &mut info.logo,
            _ => &mut info.group,
        };
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }
    Ok(info)
}

/// Build a channel from a metadata/url pair, or `None` when the pair is unusable.
fn channel_from_pair(meta: &str, url: &str) -> Option<Channel> {
    let info = match parse_extinf(meta) {
        Ok(info) => info,
        Err(e) => {
            debug!("dropping entry {:?}: {}", meta, e);
            return None;
        }
    };
    let url = url.trim();
    let name = info.name.or(info.id).unwrap_or_default();
    if name.is_empty() || url.is_empty() {
        debug!("dropping entry without name or url: {:?}", meta);
        return None;
    }
    Some(Channel {
        name,
        image: info.logo,
        group: info.group,
        url: url.to_string(),
    })
}

/// Accumulates lines two at a time after skipping the header.
#[derive(Debug, Default)]
struct LinePairs {
    header_seen: bool,
    pending: Option<String>,
    channels: Vec<Channel>,
    dropped: usize,
}

impl LinePairs {
    fn push(&mut self, line: &str) {
        if !self.header_seen {
            self.header_seen = true;
            return;
        }
        match self.pending.take() {
            None => self.pending = Some(line.to_string()),
            Some(meta) => match channel_from_pair(&meta, line) {
                Some(channel) => self.channels.push(channel),
                None => self.dropped += 1,
            },
        }
    }

    fn finish(self) -> Vec<Channel> {
        if let Some(line) = &self.pending {
            debug!("ignoring unpaired trailing line {:?}", line);
        }
        info!(
            "parsed {} channels ({} entries dropped)",
            self.channels.len(),
            self.dropped
        );
        self.channels
    }
}

/// Parse a sequence of playlist lines, header included.
pub fn parse_lines<I, S>(lines: I) -> Vec<Channel>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut pairs = LinePairs::default();
    for line in lines {
        pairs.push(line.as_ref());
    }
    pairs.finish()
}

/// Parse a playlist already held in memory, e.g. a downloaded body.
pub fn parse_playlist_str(content: &str) -> Vec<Channel> {
    parse_lines(content.lines())
}

/// Stream a playlist file line by line.
///
/// Bytes that are not valid UTF-8 are replaced rather than failing the load.
pub async fn parse_playlist_file(path: impl AsRef<Path>) -> Result<Vec<Channel>> {
    let path = path.as_ref();
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| CoreError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut pairs = LinePairs::default();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .await
            .map_err(|e| CoreError::io(path, e))?;
        if n == 0 {
            break;
        }
        if buf.ends_with(b"\n") {
            buf.pop();
            if buf.ends_with(b"\r") {
                buf.pop();
            }
        }
        pairs.push(&String::from_utf8_lossy(&buf));
    }
    Ok(pairs.finish())
}
