use chrono::{DateTime, Utc};
use feed_rs::parser;

use super::models::FeedEntry;
use crate::{Error, Result};

const UNTITLED: &str = "Untitled Article";

/// Parse RSS/Atom/JSON feed content into entries, keeping feed order
///
/// Entries without a link cannot be processed and are dropped.
pub fn parse_feed(content: &[u8]) -> Result<Vec<FeedEntry>> {
    let feed = parser::parse(content)
        .map_err(|e| Error::Fetch(format!("Unparseable feed: {}", e)))?;

    let entries = feed.entries.into_iter().filter_map(|entry| {
        let title = entry.title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());

        let Some(url) = entry.links.first().map(|l| l.href.trim().to_string()) else {
            tracing::warn!("Entry '{}' has no link, skipping", title);
            return None;
        };

        let published_at = entry.published
            .or(entry.updated)
            .map(|dt| DateTime::<Utc>::from(dt));

        Some(FeedEntry {
            title,
            url,
            published_at,
        })
    }).collect();

    Ok(entries)
}
