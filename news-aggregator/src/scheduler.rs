use crate::pipeline::{IngestionOrchestrator, RunReport};
use crate::types::IngestTrigger;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

/// Periodic driver: run, sleep `interval`, repeat until shutdown.
pub struct Scheduler {
    orchestrator: Arc<IngestionOrchestrator>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<IngestionOrchestrator>, interval: Duration) -> Self {
        Self { orchestrator, interval }
    }

    /// Loops until `shutdown` becomes `true` or its sender is dropped. A run in
    /// flight is allowed to finish; only the sleep is interrupted.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "Scheduler started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.orchestrator.run_once().await {
                Some(report) => {
                    let failed = report.sources.iter().filter(|s| !s.is_committed()).count();
                    if failed > 0 {
                        warn!(failed, "Scheduled run finished with failed sources");
                    }
                }
                None => debug!("Scheduled run skipped, another run is active"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = stopped(&mut shutdown) => break,
            }
        }

        info!("Scheduler stopped");
    }
}

/// Resolves once the flag reads `true` or the sender is gone.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Out-of-band trigger sharing the scheduler's orchestrator.
#[derive(Clone)]
pub struct IngestionHandle {
    orchestrator: Arc<IngestionOrchestrator>,
    runtime: Handle,
}

impl IngestionHandle {
    pub fn new(orchestrator: Arc<IngestionOrchestrator>, runtime: Handle) -> Self {
        Self { orchestrator, runtime }
    }

    /// Start a run in the background. Resolves to `None` if it was absorbed
    /// by a run already in progress.
    pub fn spawn_run(&self) -> JoinHandle<Option<RunReport>> {
        let orchestrator = self.orchestrator.clone();
        self.runtime.spawn(async move { orchestrator.run_once().await })
    }
}

impl IngestTrigger for IngestionHandle {
    fn trigger(&self) {
        info!("Ingestion triggered on demand");
        drop(self.spawn_run());
    }
}
