use open_tv_core::Channel;
use rayon::prelude::*;

/// Case-insensitive substring match on the channel name.
pub fn name_matches(channel: &Channel, term_lower: &str) -> bool {
    term_lower.is_empty() || channel.name.to_lowercase().contains(term_lower)
}

/// Channels whose name contains `term`, optionally restricted to one group.
/// Input order is preserved.
pub fn filter_channels<'a>(source: &'a [Channel], term: &str, group: Option<&str>) -> Vec<&'a Channel> {
    let term = term.trim().to_lowercase();
    source
        .par_iter()
        .filter(|c| group.map_or(true, |g| c.group.as_deref() == Some(g)))
        .filter(|c| name_matches(c, &term))
        .collect()
}

/// Distinct group names in first-seen order.
pub fn groups(channels: &[Channel]) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for g in channels.iter().filter_map(|c| c.group.as_deref()) {
        if !out.contains(&g) {
            out.push(g);
        }
    }
    out
}
