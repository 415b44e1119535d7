//! Auto-remediation strategies and the problem → strategy dispatch table.
//!
//! `detect_problems` tags a snapshot with the problems it shows; the
//! [`RemediationTable`] maps each tag to a [`Remediation`]. Adding a rule is
//! a new `ProblemKind` variant, a detector arm and a table entry.

use super::types::{HealthCheck, HealthStatus, SystemHealth};
use crate::issues::{IssueSeverity, IssueType};
use crate::store::DataStore;
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

/// Problems the auto-fixer knows how to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemKind {
    /// Sync probe degraded with a count mismatch.
    SyncMismatch,
    /// Database probe failed because the table does not exist.
    MissingTable,
    /// Data store probe failed.
    DataStoreUnreachable,
}

impl ProblemKind {
    pub fn issue_type(self) -> IssueType {
        match self {
            Self::SyncMismatch => IssueType::Sync,
            Self::MissingTable => IssueType::Database,
            Self::DataStoreUnreachable => IssueType::DataStore,
        }
    }

    pub fn severity(self) -> IssueSeverity {
        match self {
            Self::SyncMismatch => IssueSeverity::High,
            Self::MissingTable | Self::DataStoreUnreachable => IssueSeverity::Critical,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::SyncMismatch => "Data sync mismatch",
            Self::MissingTable => "Missing database table",
            Self::DataStoreUnreachable => "Data store connection failure",
        }
    }
}

#[allow(clippy::unwrap_used)]
fn missing_relation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"relation "?([A-Za-z0-9_.]+)"? does not exist"#).unwrap())
}

/// Table name from a `relation "public.users" does not exist` message.
pub fn missing_relation(message: &str) -> Option<&str> {
    missing_relation_re()
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Tag a snapshot with the problems it shows, in remediation order.
pub fn detect_problems(health: &SystemHealth) -> Vec<(ProblemKind, &HealthCheck)> {
    let mut problems = Vec::new();

    let sync = health.sync();
    if sync.status == HealthStatus::Degraded && sync.message.to_lowercase().contains("mismatch") {
        problems.push((ProblemKind::SyncMismatch, sync));
    }

    let database = health.database();
    if database.status == HealthStatus::Unhealthy && missing_relation(&database.message).is_some() {
        problems.push((ProblemKind::MissingTable, database));
    }

    let data_store = health.data_store();
    if data_store.status == HealthStatus::Unhealthy {
        problems.push((ProblemKind::DataStoreUnreachable, data_store));
    }

    problems
}

/// What a remediation achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemediationOutcome {
    Fixed(String),
    Failed(String),
}

impl RemediationOutcome {
    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Fixed(m) | Self::Failed(m) => m,
        }
    }
}

/// Inputs available to a remediation.
pub struct RemediationContext<'a> {
    pub check: &'a HealthCheck,
    pub store: Option<&'a dyn DataStore>,
}

#[async_trait]
pub trait Remediation: Send + Sync {
    fn name(&self) -> &'static str;

    async fn apply(&self, ctx: &RemediationContext<'_>) -> RemediationOutcome;
}

/// Ping the store once more.
pub struct RetryConnection;

#[async_trait]
impl Remediation for RetryConnection {
    fn name(&self) -> &'static str {
        "retry-connection"
    }

    async fn apply(&self, ctx: &RemediationContext<'_>) -> RemediationOutcome {
        let Some(store) = ctx.store else {
            return RemediationOutcome::Failed(
                "Cannot retry: data store connection parameters are not configured".to_string(),
            );
        };
        match store.ping().await {
            Ok(()) => {
                info!("Data store connection restored on retry");
                RemediationOutcome::Fixed("Connection restored on retry".to_string())
            }
            Err(e) => RemediationOutcome::Failed(format!("Connection retry failed: {e}")),
        }
    }
}

/// Tables cannot be created through the REST API with the monitor's key, so
/// this logs the SQL an operator has to run and always reports failure.
pub struct ManualTableCreation;

#[async_trait]
impl Remediation for ManualTableCreation {
    fn name(&self) -> &'static str {
        "manual-table-creation"
    }

    async fn apply(&self, ctx: &RemediationContext<'_>) -> RemediationOutcome {
        let table = missing_relation(&ctx.check.message).unwrap_or("unknown");
        warn!(
            table,
            "Missing table; create it in the data store SQL editor, e.g. \
             `CREATE TABLE {table} (id uuid primary key default gen_random_uuid(), created_at timestamptz default now());` \
             then enable row-level security and re-run the health check"
        );
        RemediationOutcome::Failed(format!(
            "Table '{table}' must be created manually in the data store SQL editor"
        ))
    }
}

/// Placeholder for a re-sync; no sync job is wired into the monitor.
pub struct ResyncStub;

#[async_trait]
impl Remediation for ResyncStub {
    fn name(&self) -> &'static str {
        "resync"
    }

    async fn apply(&self, _ctx: &RemediationContext<'_>) -> RemediationOutcome {
        info!("Sync mismatch detected; automatic sync is not available");
        RemediationOutcome::Failed(
            "Automatic sync is not available; run the data sync job manually".to_string(),
        )
    }
}

/// Problem → strategy dispatch.
#[derive(Clone)]
pub struct RemediationTable {
    rules: HashMap<ProblemKind, Arc<dyn Remediation>>,
}

impl Default for RemediationTable {
    fn default() -> Self {
        Self::empty()
            .with_rule(ProblemKind::SyncMismatch, Arc::new(ResyncStub))
            .with_rule(ProblemKind::MissingTable, Arc::new(ManualTableCreation))
            .with_rule(ProblemKind::DataStoreUnreachable, Arc::new(RetryConnection))
    }
}

impl RemediationTable {
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Register (or replace) the strategy for `kind`.
    #[must_use]
    pub fn with_rule(mut self, kind: ProblemKind, remediation: Arc<dyn Remediation>) -> Self {
        self.rules.insert(kind, remediation);
        self
    }

    pub fn get(&self, kind: ProblemKind) -> Option<&Arc<dyn Remediation>> {
        self.rules.get(&kind)
    }
}
