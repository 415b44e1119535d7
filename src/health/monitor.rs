//! Health monitor: cached, single-flight health snapshots with throttled
//! auto-remediation.
//!
//! ## Check state machine
//!
//! ```text
//!   Idle ──check──▶ Checking ──cycle done──▶ Cached ──ttl expired / invalidate──▶ Idle
//!                      ▲                        │
//!                      └──────────check─────────┘ (only once the ttl has expired)
//! ```
//!
//! Callers arriving while a cycle is `Checking` subscribe to that cycle's
//! `watch` channel instead of starting another one, so at most one probe
//! cycle runs per cache window. The cycle itself runs on a spawned task so a
//! cancelled caller cannot strand the others.
//!
//! The snapshot is published before the auto-fix pass runs; callers that
//! need its side effects (queued issues, invalidation) await
//! [`HealthMonitor::auto_fix_settled`].

use super::probes;
use super::remediation::{detect_problems, ProblemKind, RemediationContext, RemediationOutcome, RemediationTable};
use super::types::{HealthSummary, SystemHealth};
use crate::config::MonitorConfig;
use crate::issues::{IssueQueue, NewIssue};
use crate::store::DataStore;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum HealthError {
    /// The probe cycle task ended without publishing a snapshot.
    #[error("health check cycle aborted before producing a snapshot")]
    CycleAborted,
}

enum CheckState {
    Idle,
    Checking(watch::Receiver<Option<Arc<SystemHealth>>>),
    Cached {
        snapshot: Arc<SystemHealth>,
        taken_at: Instant,
    },
}

/// Result of one `auto_fix` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoFixReport {
    /// False when skipped (healthy snapshot or cooldown not elapsed).
    pub attempted: bool,
    pub outcomes: Vec<(ProblemKind, RemediationOutcome)>,
    /// Ids of issues queued for failed remediations.
    pub issues: Vec<String>,
}

pub struct HealthMonitor {
    config: MonitorConfig,
    store: Option<Arc<dyn DataStore>>,
    issues: Arc<IssueQueue>,
    remediations: RemediationTable,
    state: Mutex<CheckState>,
    last_auto_fix: Mutex<Option<Instant>>,
    /// Held by a cycle from publishing its snapshot until its auto-fix pass ends.
    auto_fix_pass: Mutex<()>,
}

impl HealthMonitor {
    /// `store = None` means the data store is not configured; every
    /// store-backed probe then reports unhealthy.
    pub fn new(
        config: MonitorConfig,
        store: Option<Arc<dyn DataStore>>,
        issues: Arc<IssueQueue>,
    ) -> Self {
        Self::with_remediations(config, store, issues, RemediationTable::default())
    }

    pub fn with_remediations(
        config: MonitorConfig,
        store: Option<Arc<dyn DataStore>>,
        issues: Arc<IssueQueue>,
        remediations: RemediationTable,
    ) -> Self {
        if store.is_none() {
            warn!("Data store not configured; health probes will report unhealthy");
        }
        Self {
            config,
            store,
            issues,
            remediations,
            state: Mutex::new(CheckState::Idle),
            last_auto_fix: Mutex::new(None),
            auto_fix_pass: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn issues(&self) -> &Arc<IssueQueue> {
        &self.issues
    }

    fn store(&self) -> Option<&dyn DataStore> {
        self.store.as_deref()
    }

    /// Current snapshot: the cached one while fresh, otherwise the result of
    /// the in-flight or a new probe cycle.
    pub async fn check_system_health(self: &Arc<Self>) -> Result<Arc<SystemHealth>, HealthError> {
        let mut rx = {
            let mut state = self.state.lock().await;
            let in_flight = match &*state {
                CheckState::Cached { snapshot, taken_at }
                    if taken_at.elapsed() < self.config.cache_ttl() =>
                {
                    debug!("Returning cached health snapshot");
                    return Ok(Arc::clone(snapshot));
                }
                CheckState::Checking(rx) => Some(rx.clone()),
                CheckState::Cached { .. } | CheckState::Idle => None,
            };
            match in_flight {
                Some(rx) => {
                    debug!("Joining in-flight health check");
                    rx
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    *state = CheckState::Checking(rx.clone());
                    let monitor = Arc::clone(self);
                    tokio::spawn(async move { monitor.run_cycle(tx).await });
                    rx
                }
            }
        };

        let published = match rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };
        match published {
            Some(snapshot) => Ok(snapshot),
            None => {
                error!("Health check cycle ended without a snapshot");
                let mut state = self.state.lock().await;
                if matches!(&*state, CheckState::Checking(current) if current.same_channel(&rx)) {
                    *state = CheckState::Idle;
                }
                Err(HealthError::CycleAborted)
            }
        }
    }

    async fn run_cycle(self: Arc<Self>, tx: watch::Sender<Option<Arc<SystemHealth>>>) {
        let snapshot = Arc::new(self.run_probes().await);
        info!(overall = %snapshot.overall(), "Health check complete");

        *self.state.lock().await = CheckState::Cached {
            snapshot: Arc::clone(&snapshot),
            taken_at: Instant::now(),
        };

        // Waiters are released before the auto-fix pass starts.
        let pass = self.auto_fix_pass.lock().await;
        // A send error only means nobody is waiting.
        let _ = tx.send(Some(Arc::clone(&snapshot)));
        self.auto_fix(&snapshot).await;
        drop(pass);
    }

    /// Wait until the auto-fix pass of the most recently published cycle
    /// has finished. Returns immediately when none is running.
    pub async fn auto_fix_settled(&self) {
        let _pass = self.auto_fix_pass.lock().await;
    }

    /// Run the four probes sequentially and aggregate.
    async fn run_probes(&self) -> SystemHealth {
        let store = self.store();
        let data_store = probes::probe_data_store(store, self.config.slow_probe_threshold()).await;
        let database = probes::probe_database(store, &self.config.primary_table).await;
        let api = probes::probe_api(store);
        let sync = probes::probe_sync(store, &self.config.sync_table).await;
        SystemHealth::from_checks(data_store, database, api, sync)
    }

    /// Drop a cached snapshot so the next check re-probes. An in-flight
    /// cycle is left alone.
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        if matches!(&*state, CheckState::Cached { .. }) {
            *state = CheckState::Idle;
            debug!("Health snapshot invalidated");
        }
    }

    /// Summary of the current snapshot.
    pub async fn health_summary(self: &Arc<Self>) -> Result<HealthSummary, HealthError> {
        Ok(self.check_system_health().await?.summary())
    }

    /// Attempt remediations for the problems in `health`, at most once per
    /// cooldown window. Failed remediations are queued as issues.
    pub(crate) async fn auto_fix(&self, health: &SystemHealth) -> AutoFixReport {
        if health.overall().is_healthy() {
            return AutoFixReport::default();
        }

        {
            let mut last = self.last_auto_fix.lock().await;
            if let Some(at) = *last {
                if at.elapsed() < self.config.auto_fix_cooldown() {
                    debug!(
                        since_secs = at.elapsed().as_secs(),
                        "Auto-fix skipped (cooldown)"
                    );
                    return AutoFixReport::default();
                }
            }
            *last = Some(Instant::now());
        }

        let mut report = AutoFixReport {
            attempted: true,
            ..AutoFixReport::default()
        };

        for (kind, check) in detect_problems(health) {
            let Some(remediation) = self.remediations.get(kind) else {
                debug!(problem = ?kind, "No remediation registered");
                continue;
            };

            info!(problem = ?kind, remediation = remediation.name(), "Attempting auto-fix");
            let ctx = RemediationContext {
                check,
                store: self.store(),
            };
            let outcome = remediation.apply(&ctx).await;

            match &outcome {
                RemediationOutcome::Fixed(msg) => {
                    info!(problem = ?kind, result = %msg, "Auto-fix succeeded");
                    self.invalidate().await;
                }
                RemediationOutcome::Failed(msg) => {
                    warn!(problem = ?kind, result = %msg, "Auto-fix failed");
                    let issue = NewIssue::new(
                        kind.issue_type(),
                        kind.severity(),
                        kind.title(),
                        check.message.clone(),
                    )
                    .with_context(serde_json::json!({
                        "check": check,
                        "remediation": remediation.name(),
                    }))
                    .with_auto_fix(msg.clone());
                    report.issues.push(self.issues.add_issue(issue).await);
                }
            }
            report.outcomes.push((kind, outcome));
        }

        report
    }
}
