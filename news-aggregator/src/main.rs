use anyhow::Context;
use clap::Parser;
use news_aggregator::config::Command;
use news_aggregator::logging::{init_logging, LogConfig};
use news_aggregator::{
    AppConfig, ArticleQuery, ArticleRepository, Fetcher, FetchConfig, IngestionHandle,
    IngestionOrchestrator, KeyValueStore, MemoryArticleRepository, MemoryStore, PgArticleRepository,
    RedisStore, RuleRegistry, RunReport, Scheduler, SourceOutcome, SummarizerConfig, SummaryCache, TextRankSummarizer,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

const CONNECT_ATTEMPTS: u32 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::parse();
    let _log_guard = init_logging(&LogConfig {
        directory: config.log_dir.clone(),
        ..LogConfig::default()
    })?;

    let (repository, pool) = open_repository(&config).await?;
    let cache = SummaryCache::with_ttl(
        open_cache_store(&config).await,
        Duration::from_secs(config.cache_ttl_secs),
    );

    match &config.command {
        Command::Summary { url } => {
            let query = ArticleQuery::new(repository, cache);
            let summary = query.summary_for(url).await;
            close_pool(pool).await;
            match summary? {
                Some(summary) => println!("{}", summary),
                None => anyhow::bail!("no article stored for {}", url),
            }
        }
        Command::Once => {
            let orchestrator = build_orchestrator(&config, repository, cache)?;
            if let Some(report) = orchestrator.run_once().await {
                print_report(&report);
            }
            close_pool(pool).await;
        }
        Command::Run => {
            let orchestrator = Arc::new(build_orchestrator(&config, repository, cache)?);
            let (shutdown_tx, shutdown_rx) = watch::channel(false);

            #[cfg(unix)]
            listen_for_trigger(IngestionHandle::new(
                orchestrator.clone(),
                tokio::runtime::Handle::current(),
            ))?;

            let scheduler = Scheduler::new(orchestrator, Duration::from_secs(config.interval_secs));
            let loop_task = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

            tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
            info!("Shutdown requested, waiting for the current run to finish");
            let _ = shutdown_tx.send(true);
            loop_task.await?;
            close_pool(pool).await;
        }
    }

    Ok(())
}

/// Returns the repository plus, when backed by PostgreSQL, the handle used to
/// close its pool on shutdown.
async fn open_repository(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn ArticleRepository>, Option<PgArticleRepository>)> {
    let Some(database_url) = &config.database_url else {
        warn!("DATABASE_URL is not set, articles are kept in memory only");
        return Ok((Arc::new(MemoryArticleRepository::new()), None));
    };

    info!("Connecting to database: {}", redact(database_url));
    let repository = PgArticleRepository::connect(database_url, CONNECT_ATTEMPTS)
        .await
        .map_err(|e| {
            error!("Failed to connect to database. Make sure PostgreSQL is running");
            error!("  Check connection string: {}", redact(database_url));
            e
        })?;
    repository.setup_schema().await?;
    Ok((Arc::new(repository.clone()), Some(repository)))
}

async fn close_pool(pool: Option<PgArticleRepository>) {
    if let Some(pool) = pool {
        info!("Closing database pool");
        pool.close().await;
    }
}

async fn open_cache_store(config: &AppConfig) -> Arc<dyn KeyValueStore> {
    let Some(redis_url) = &config.redis_url else {
        return Arc::new(MemoryStore::new());
    };

    info!("Connecting to redis: {}", redact(redis_url));
    match RedisStore::connect(redis_url).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("Redis unavailable ({}), summaries are cached in memory only", e);
            Arc::new(MemoryStore::new())
        }
    }
}

fn build_orchestrator(
    config: &AppConfig,
    repository: Arc<dyn ArticleRepository>,
    cache: SummaryCache,
) -> anyhow::Result<IngestionOrchestrator> {
    let fetcher = Fetcher::new(FetchConfig::default())?;
    let rules = RuleRegistry::with_builtin_rules()?;
    let summarizer = TextRankSummarizer::new(SummarizerConfig {
        compression_ratio: config.compression_ratio,
        ..SummarizerConfig::default()
    });
    let sources = config.source_registry();
    if sources.is_empty() {
        anyhow::bail!("no sources configured");
    }

    Ok(IngestionOrchestrator::new(fetcher, rules, summarizer, repository, cache, sources))
}

/// SIGHUP starts an out-of-band run.
#[cfg(unix)]
fn listen_for_trigger(handle: IngestionHandle) -> anyhow::Result<()> {
    use news_aggregator::IngestTrigger;
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            handle.trigger();
        }
    });
    Ok(())
}

fn print_report(report: &RunReport) {
    for source in &report.sources {
        match &source.outcome {
            SourceOutcome::Committed { inserted, skipped } => println!(
                "{:<12} committed  inserted={} skipped={} ({:.1}s)",
                source.source,
                inserted,
                skipped,
                source.duration.as_secs_f64()
            ),
            SourceOutcome::RolledBack { error } => println!(
                "{:<12} rolled back: {} ({:.1}s)",
                source.source,
                error,
                source.duration.as_secs_f64()
            ),
        }
    }
    println!(
        "{} new article(s) in {:.1}s",
        report.inserted(),
        report.duration.as_secs_f64()
    );
}

fn redact(connection_url: &str) -> String {
    match url::Url::parse(connection_url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        Ok(parsed) => parsed.to_string(),
        Err(_) => "<unparsable connection url>".to_string(),
    }
}
