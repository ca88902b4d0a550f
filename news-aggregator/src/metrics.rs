use crate::types::{MetricEvent, MetricsSink};
use std::future::Future;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Writes every event to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetrics;

impl MetricsSink for TracingMetrics {
    fn record(&self, event: MetricEvent) {
        match event {
            MetricEvent::Request { method, endpoint, status_code, duration } => {
                debug!(%method, %endpoint, status_code, elapsed_ms = duration.as_millis() as u64, "request");
            }
            MetricEvent::Source { source, duration } => {
                info!(%source, elapsed_ms = duration.as_millis() as u64, "source processed");
            }
            MetricEvent::ArticlesProcessed { source, count } => {
                info!(%source, count, "articles processed");
            }
            MetricEvent::DbOperation { operation, duration } => {
                debug!(%operation, elapsed_ms = duration.as_millis() as u64, "db operation");
            }
            MetricEvent::Run { duration, sources, inserted } => {
                info!(sources, inserted, elapsed_ms = duration.as_millis() as u64, "ingestion run finished");
            }
        }
    }
}

/// Forwards events to an exporter task. Events are dropped once the
/// receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelMetrics {
    tx: mpsc::UnboundedSender<MetricEvent>,
}

impl ChannelMetrics {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MetricEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl MetricsSink for ChannelMetrics {
    fn record(&self, event: MetricEvent) {
        let _ = self.tx.send(event);
    }
}

/// Await `operation` and report its duration as a db operation.
pub async fn timed_db<T, F>(metrics: &dyn MetricsSink, name: &str, operation: F) -> T
where
    F: Future<Output = T>,
{
    let started = Instant::now();
    let result = operation.await;
    metrics.record_db_operation(name, started.elapsed());
    result
}
