//! Capped in-memory issue queue.
//!
//! Newest issues sit at the front. The queue never holds more than
//! `capacity` entries; adding to a full queue evicts the oldest.

use super::{report, Issue, IssueStatus, NewIssue};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default maximum queue size
pub const DEFAULT_CAPACITY: usize = 50;

pub struct IssueQueue {
    issues: RwLock<VecDeque<Issue>>,
    capacity: usize,
    retention: chrono::Duration,
}

impl Default for IssueQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, chrono::Duration::hours(24))
    }
}

impl IssueQueue {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize, retention: chrono::Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            issues: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            retention,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Queue an issue as pending and return its id.
    pub async fn add_issue(&self, issue: NewIssue) -> String {
        self.add_issue_at(issue, Utc::now()).await
    }

    pub(crate) async fn add_issue_at(&self, issue: NewIssue, timestamp: DateTime<Utc>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        warn!(
            id = %id,
            issue_type = %issue.issue_type,
            severity = %issue.severity,
            title = %issue.title,
            "Issue queued"
        );

        let mut issues = self.issues.write().await;
        issues.push_front(Issue {
            id: id.clone(),
            timestamp,
            issue_type: issue.issue_type,
            severity: issue.severity,
            title: issue.title,
            description: issue.description,
            context: issue.context,
            auto_fix_attempted: issue.auto_fix_attempted,
            auto_fix_result: issue.auto_fix_result,
            status: IssueStatus::Pending,
            claude_response: None,
        });
        if issues.len() > self.capacity {
            let evicted = issues.len() - self.capacity;
            issues.truncate(self.capacity);
            debug!(evicted, "Issue queue full, dropped oldest");
        }
        id
    }

    pub async fn len(&self) -> usize {
        self.issues.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.issues.read().await.is_empty()
    }

    /// All issues, newest first.
    pub async fn all_issues(&self) -> Vec<Issue> {
        self.issues.read().await.iter().cloned().collect()
    }

    pub async fn get(&self, id: &str) -> Option<Issue> {
        self.issues.read().await.iter().find(|i| i.id == id).cloned()
    }

    /// Pending issues, newest first.
    pub async fn pending_issues(&self) -> Vec<Issue> {
        self.issues
            .read()
            .await
            .iter()
            .filter(|i| i.status == IssueStatus::Pending)
            .cloned()
            .collect()
    }

    /// Move an issue to `next`. Returns false when the id is unknown or the
    /// transition would move backward.
    async fn transition(&self, id: &str, next: IssueStatus, note: Option<String>) -> bool {
        let mut issues = self.issues.write().await;
        let Some(issue) = issues.iter_mut().find(|i| i.id == id) else {
            return false;
        };
        if !issue.status.can_become(next) {
            debug!(id, from = ?issue.status, to = ?next, "Rejected issue transition");
            return false;
        }
        issue.status = next;
        if note.is_some() {
            issue.claude_response = note;
        }
        info!(id, status = ?next, "Issue updated");
        true
    }

    pub async fn mark_in_progress(&self, id: &str) -> bool {
        self.transition(id, IssueStatus::InProgress, None).await
    }

    pub async fn resolve_issue(&self, id: &str, note: Option<String>) -> bool {
        self.transition(id, IssueStatus::Resolved, note).await
    }

    pub async fn fail_issue(&self, id: &str, note: Option<String>) -> bool {
        self.transition(id, IssueStatus::Failed, note).await
    }

    /// Plain-text report of pending issues, most severe first.
    pub async fn generate_issue_report(&self) -> String {
        report::render(&self.pending_issues().await)
    }

    /// Remove resolved issues older than the retention window.
    pub async fn cleanup_old_issues(&self) -> usize {
        self.cleanup_resolved_before(Utc::now() - self.retention).await
    }

    async fn cleanup_resolved_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut issues = self.issues.write().await;
        let before = issues.len();
        issues.retain(|i| !(i.status == IssueStatus::Resolved && i.timestamp < cutoff));
        before - issues.len()
    }
}

/// Spawn a background task that purges old resolved issues every `interval`
/// until `shutdown` is cancelled.
pub fn spawn_issue_cleanup(
    queue: Arc<IssueQueue>,
    interval: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; skip it.
        ticker.tick().await;
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = queue.cleanup_old_issues().await;
                    if removed > 0 {
                        info!(removed, "Issue cleanup complete");
                    }
                }
            }
        }
        debug!("Issue cleanup task stopped");
    })
}
