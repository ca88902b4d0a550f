use crate::types::{AggregatorError, FeedEntry, Result};
use feed_rs::parser;
use std::collections::HashSet;
use tracing::debug;

pub struct FeedParser {
    max_entries: usize,
}

impl FeedParser {
    pub fn new(max_entries: usize) -> Self {
        Self { max_entries }
    }

    /// Parse an RSS/Atom/JSON feed document into at most `max_entries`
    /// entries, in document order.
    pub fn parse_feed(&self, content: &str) -> Result<Vec<FeedEntry>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| AggregatorError::FeedRead(format!("Failed to parse feed: {}", e)))?;

        let mut seen_urls = HashSet::new();
        let entries = feed
            .entries
            .into_iter()
            .take(self.max_entries)
            .filter_map(Self::parse_entry)
            .filter(|entry| {
                let fresh = seen_urls.insert(entry.url.clone());
                if !fresh {
                    debug!("Skipping duplicate entry with URL: {}", entry.url);
                }
                fresh
            })
            .collect::<Vec<_>>();

        debug!("Parsed feed with {} entries", entries.len());
        Ok(entries)
    }

    fn parse_entry(entry: feed_rs::model::Entry) -> Option<FeedEntry> {
        let Some(link) = entry.links.first() else {
            debug!("Skipping entry without link: {}", entry.id);
            return None;
        };

        let title = entry
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled".to_string());

        Some(FeedEntry {
            title,
            url: link.href.clone(),
            published: entry.published,
        })
    }
}

impl Default for FeedParser {
    fn default() -> Self {
        Self::new(10)
    }
}
