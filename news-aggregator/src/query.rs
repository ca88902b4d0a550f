use crate::cache::SummaryCache;
use crate::metrics::{timed_db, TracingMetrics};
use crate::repository::ArticleRepository;
use crate::types::{Article, MetricsSink, Result};
use std::sync::Arc;
use tracing::debug;

/// Read side for the serving layer. Summaries come from the cache first and
/// fall back to the repository, refilling the cache on the way out.
#[derive(Clone)]
pub struct ArticleQuery {
    repository: Arc<dyn ArticleRepository>,
    cache: SummaryCache,
    metrics: Arc<dyn MetricsSink>,
}

impl ArticleQuery {
    pub fn new(repository: Arc<dyn ArticleRepository>, cache: SummaryCache) -> Self {
        Self {
            repository,
            cache,
            metrics: Arc::new(TracingMetrics),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// `Ok(None)` when no article with this url is stored.
    pub async fn summary_for(&self, url: &str) -> Result<Option<String>> {
        if let Some(summary) = self.cache.get_summary(url).await {
            debug!(url = %url, "Summary cache hit");
            return Ok(Some(summary));
        }

        let article = timed_db(self.metrics.as_ref(), "find_by_url", self.repository.find_by_url(url)).await?;
        let Some(article) = article else {
            return Ok(None);
        };

        self.cache.set_summary(url, &article.summary).await;
        Ok(Some(article.summary))
    }

    pub async fn article(&self, url: &str) -> Result<Option<Article>> {
        timed_db(self.metrics.as_ref(), "find_by_url", self.repository.find_by_url(url)).await
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<Article>> {
        timed_db(self.metrics.as_ref(), "recent", self.repository.recent(limit)).await
    }

    pub async fn by_source(&self, source: &str, limit: usize) -> Result<Vec<Article>> {
        timed_db(self.metrics.as_ref(), "by_source", self.repository.by_source(source, limit)).await
    }
}
