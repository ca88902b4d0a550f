use crate::fetcher::Fetcher;
use crate::parser::FeedParser;
use crate::types::{FeedEntry, Result};
use tracing::{info, warn};

/// Reads a syndication feed into a bounded list of candidate entries.
pub struct FeedReader {
    fetcher: Fetcher,
    parser: FeedParser,
}

impl FeedReader {
    pub fn new(fetcher: Fetcher) -> Self {
        let parser = FeedParser::new(fetcher.config().max_entries);
        Self { fetcher, parser }
    }

    /// Fetch and parse `feed_url`. Network and parse failures are logged and
    /// read as an empty feed.
    pub async fn fetch(&self, feed_url: &str) -> Vec<FeedEntry> {
        match self.try_fetch(feed_url).await {
            Ok(entries) => {
                info!(feed = %feed_url, entries = entries.len(), "Read feed");
                entries
            }
            Err(e) => {
                warn!(feed = %feed_url, error = %e, "Feed read failed");
                Vec::new()
            }
        }
    }

    pub async fn try_fetch(&self, feed_url: &str) -> Result<Vec<FeedEntry>> {
        let content = self.fetcher.fetch_text(feed_url).await?;
        self.parser.parse_feed(&content)
    }
}
