//! Issue queue: in-memory record of remediations that need follow-up
//!
//! ## Modules
//!
//! - `queue`: capped queue with status transitions and cleanup
//! - `report`: plain-text rendering of pending issues

pub mod queue;
pub mod report;

pub use queue::{spawn_issue_cleanup, IssueQueue};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Surface an issue was raised against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueType {
    DataStore,
    Database,
    Api,
    Sync,
    System,
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DataStore => "data-store",
            Self::Database => "database",
            Self::Api => "api",
            Self::Sync => "sync",
            Self::System => "system",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Lifecycle of an issue: pending → in_progress → resolved | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Pending,
    InProgress,
    Resolved,
    Failed,
}

impl IssueStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Failed)
    }

    /// Transitions only move forward.
    pub fn can_become(self, next: Self) -> bool {
        match (self, next) {
            (Self::Pending, Self::InProgress | Self::Resolved | Self::Failed) => true,
            (Self::InProgress, Self::Resolved | Self::Failed) => true,
            _ => false,
        }
    }
}

/// A queued issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: IssueSeverity,
    pub title: String,
    pub description: String,
    pub context: serde_json::Value,
    pub auto_fix_attempted: bool,
    pub auto_fix_result: Option<String>,
    pub status: IssueStatus,
    /// Resolution note recorded by whoever handled the issue.
    pub claude_response: Option<String>,
}

/// Caller-supplied part of an issue; the queue assigns id, timestamp and status.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIssue {
    pub issue_type: IssueType,
    pub severity: IssueSeverity,
    pub title: String,
    pub description: String,
    pub context: serde_json::Value,
    pub auto_fix_attempted: bool,
    pub auto_fix_result: Option<String>,
}

impl NewIssue {
    pub fn new(
        issue_type: IssueType,
        severity: IssueSeverity,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            issue_type,
            severity,
            title: title.into(),
            description: description.into(),
            context: serde_json::Value::Null,
            auto_fix_attempted: false,
            auto_fix_result: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }

    /// Record that an automatic fix was tried and what came of it.
    #[must_use]
    pub fn with_auto_fix(mut self, result: impl Into<String>) -> Self {
        self.auto_fix_attempted = true;
        self.auto_fix_result = Some(result.into());
        self
    }
}
