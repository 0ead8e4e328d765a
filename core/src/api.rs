use tracing::info;

use crate::error::Result;
use crate::models::Channel;
use crate::parser::parse_playlist_str;

/// Download a remote playlist with a single GET and parse it.
///
/// Transport failures and non-2xx answers are both reported as `CoreError::Fetch`.
pub async fn fetch_playlist(client: &reqwest::Client, url: &str) -> Result<Vec<Channel>> {
    let res = client.get(url).send().await?.error_for_status()?;
    let body = res.text().await?;
    info!("downloaded playlist from {} ({} bytes)", url, body.len());
    Ok(parse_playlist_str(&body))
}
