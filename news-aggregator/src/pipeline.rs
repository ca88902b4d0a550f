use crate::cache::SummaryCache;
use crate::config::{SourceRegistry, SourceSpec};
use crate::extraction::{ContentExtractor, RuleRegistry};
use crate::feed_reader::FeedReader;
use crate::fetcher::Fetcher;
use crate::metrics::{timed_db, TracingMetrics};
use crate::repository::{ArticleRepository, ArticleSession};
use crate::summarizer::TextRankSummarizer;
use crate::types::{InsertOutcome, MetricEvent, MetricsSink, NewArticle, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    Committed { inserted: usize, skipped: usize },
    RolledBack { error: String },
}

#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: String,
    pub outcome: SourceOutcome,
    pub duration: Duration,
}

impl SourceReport {
    pub fn inserted(&self) -> usize {
        match self.outcome {
            SourceOutcome::Committed { inserted, .. } => inserted,
            SourceOutcome::RolledBack { .. } => 0,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self.outcome, SourceOutcome::Committed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    /// One entry per configured source, in registry order.
    pub sources: Vec<SourceReport>,
    pub duration: Duration,
}

impl RunReport {
    pub fn inserted(&self) -> usize {
        self.sources.iter().map(SourceReport::inserted).sum()
    }

    pub fn source(&self, id: &str) -> Option<&SourceReport> {
        self.sources.iter().find(|s| s.source == id)
    }
}

/// Drives one ingestion pass over every configured source.
///
/// Each source is its own batch: entries already stored are skipped before
/// any fetch, new ones are extracted, summarized, staged and written through
/// to the cache, then the batch commits. A failing source rolls back alone
/// and the run moves on. At most one run is active at a time.
pub struct IngestionOrchestrator {
    feeds: FeedReader,
    extractor: ContentExtractor,
    summarizer: TextRankSummarizer,
    repository: Arc<dyn ArticleRepository>,
    cache: SummaryCache,
    metrics: Arc<dyn MetricsSink>,
    sources: SourceRegistry,
    running: Mutex<()>,
}

impl IngestionOrchestrator {
    pub fn new(
        fetcher: Fetcher,
        rules: RuleRegistry,
        summarizer: TextRankSummarizer,
        repository: Arc<dyn ArticleRepository>,
        cache: SummaryCache,
        sources: SourceRegistry,
    ) -> Self {
        Self {
            feeds: FeedReader::new(fetcher.clone()),
            extractor: ContentExtractor::new(fetcher, rules),
            summarizer,
            repository,
            cache,
            metrics: Arc::new(TracingMetrics),
            sources,
            running: Mutex::new(()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    /// Run every source once. Returns `None` without doing any work when
    /// another run holds the guard.
    pub async fn run_once(&self) -> Option<RunReport> {
        let Ok(_guard) = self.running.try_lock() else {
            info!("Ingestion run already in progress, skipping");
            return None;
        };

        let run_id = Uuid::new_v4();
        let started = Instant::now();
        info!(%run_id, sources = self.sources.len(), "Starting ingestion run");

        let mut reports = Vec::with_capacity(self.sources.len());
        match timed_db(self.metrics.as_ref(), "session", self.repository.session()).await {
            Ok(mut session) => {
                for spec in self.sources.iter() {
                    reports.push(self.run_source(session.as_mut(), spec).await);
                }
                // session dropped here; any open batch is released
            }
            Err(e) => {
                error!(%run_id, error = %e, "Could not open repository session");
                reports.extend(self.sources.iter().map(|spec| SourceReport {
                    source: spec.id.clone(),
                    outcome: SourceOutcome::RolledBack { error: e.to_string() },
                    duration: Duration::ZERO,
                }));
            }
        }

        let report = RunReport {
            sources: reports,
            duration: started.elapsed(),
        };
        self.metrics.record(MetricEvent::Run {
            duration: report.duration,
            sources: report.sources.len(),
            inserted: report.inserted(),
        });
        info!(
            %run_id,
            inserted = report.inserted(),
            elapsed_ms = report.duration.as_millis() as u64,
            "Ingestion run finished"
        );
        Some(report)
    }

    async fn run_source(&self, session: &mut dyn ArticleSession, spec: &SourceSpec) -> SourceReport {
        let started = Instant::now();

        let outcome = match self.ingest_source(session, spec).await {
            Ok((inserted, skipped)) => {
                info!(source = %spec.id, inserted, skipped, "Committed source batch");
                self.metrics.record(MetricEvent::ArticlesProcessed {
                    source: spec.id.clone(),
                    count: inserted,
                });
                SourceOutcome::Committed { inserted, skipped }
            }
            Err(e) => {
                error!(
                    source = %spec.id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "Source failed, rolling back batch"
                );
                if let Err(rollback_err) =
                    timed_db(self.metrics.as_ref(), "rollback", session.rollback()).await
                {
                    warn!(source = %spec.id, error = %rollback_err, "Rollback failed");
                }
                SourceOutcome::RolledBack { error: e.to_string() }
            }
        };

        let duration = started.elapsed();
        self.metrics.record_source(&spec.id, duration);
        SourceReport {
            source: spec.id.clone(),
            outcome,
            duration,
        }
    }

    /// Returns `(inserted, skipped)` after committing the batch.
    async fn ingest_source(
        &self,
        session: &mut dyn ArticleSession,
        spec: &SourceSpec,
    ) -> Result<(usize, usize)> {
        let metrics = self.metrics.as_ref();
        let entries = self.feeds.fetch(&spec.feed_url).await;
        let mut inserted: usize = 0;
        let mut skipped = 0;

        for entry in entries {
            if timed_db(metrics, "exists", session.exists(&entry.url)).await? {
                debug!(source = %spec.id, url = %entry.url, "Already ingested");
                skipped += 1;
                continue;
            }

            let Some(content) = self.extractor.extract(&entry.url).await else {
                skipped += 1;
                continue;
            };
            let Some(summary) = self
                .summarizer
                .summarize(&content, self.summarizer.compression_ratio())
            else {
                debug!(source = %spec.id, url = %entry.url, "No summary, skipping");
                skipped += 1;
                continue;
            };

            let article = NewArticle {
                title: entry.title,
                url: entry.url,
                source: spec.id.clone(),
                content,
                summary,
            };
            match timed_db(metrics, "insert", session.insert(article)).await? {
                InsertOutcome::Inserted(stored) => {
                    inserted += 1;
                    self.cache.set_summary(&stored.url, &stored.summary).await;
                }
                InsertOutcome::AlreadyExists => skipped += 1,
            }
        }

        let dropped = timed_db(metrics, "commit", session.commit()).await?;
        if dropped > 0 {
            debug!(source = %spec.id, dropped, "Concurrent run committed some urls first");
        }
        Ok((inserted.saturating_sub(dropped), skipped + dropped))
    }
}
