//! Service lifecycle: builds the monitor and issue queue once at startup,
//! runs their background tasks, and stops them on shutdown.
//!
//! Request handlers receive a [`MonitorHandle`]; nothing in the crate is a
//! process-wide global, so each `MonitorService` is an independent instance
//! with its own cache and queue.

use crate::config::MonitorConfig;
use crate::health::HealthMonitor;
use crate::issues::{spawn_issue_cleanup, IssueQueue};
use crate::store::DataStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Cloneable handle passed to request handlers.
#[derive(Clone)]
pub struct MonitorHandle {
    pub monitor: Arc<HealthMonitor>,
    pub issues: Arc<IssueQueue>,
}

impl MonitorHandle {
    /// Build a handle without background tasks (tests, embedding).
    pub fn new(config: MonitorConfig, store: Option<Arc<dyn DataStore>>) -> Self {
        let issues = Arc::new(IssueQueue::new(config.issue_capacity, config.issue_retention()));
        let monitor = Arc::new(HealthMonitor::new(config, store, Arc::clone(&issues)));
        Self { monitor, issues }
    }
}

/// Owns the monitor and its background tasks.
pub struct MonitorService {
    handle: MonitorHandle,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl MonitorService {
    /// Construct the monitor and start the issue cleanup task and, when
    /// configured, the background health poller.
    pub fn start(config: MonitorConfig, store: Option<Arc<dyn DataStore>>) -> Self {
        let cleanup_interval = config.cleanup_interval();
        let poll_interval = config.poll_interval();
        let handle = MonitorHandle::new(config, store);
        let shutdown = CancellationToken::new();

        let mut tasks = vec![spawn_issue_cleanup(
            Arc::clone(&handle.issues),
            cleanup_interval,
            shutdown.clone(),
        )];
        info!(interval_secs = cleanup_interval.as_secs(), "Issue cleanup task started");

        if let Some(interval) = poll_interval {
            tasks.push(spawn_health_poller(
                Arc::clone(&handle.monitor),
                interval,
                shutdown.clone(),
            ));
            info!(interval_secs = interval.as_secs(), "Health poller started");
        }

        Self {
            handle,
            shutdown,
            tasks,
        }
    }

    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }

    /// Token cancelled on shutdown; also usable to drive server shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop background tasks and wait for them to exit.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }
        info!("Monitor service stopped");
    }
}

/// Periodically refresh the health snapshot so auto-fix runs without HTTP
/// traffic. Each tick goes through the normal cache and single-flight path.
pub fn spawn_health_poller(
    monitor: Arc<HealthMonitor>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    match monitor.check_system_health().await {
                        Ok(health) => debug!(overall = %health.overall(), "Background health check"),
                        Err(e) => warn!(error = %e, "Background health check failed"),
                    }
                }
            }
        }
        debug!("Health poller stopped");
    })
}
