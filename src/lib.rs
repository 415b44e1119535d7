//! Taskdeck Monitor: health checks and auto-remediation for the Taskdeck
//! dashboard's remote data store
//!
//! ## Architecture
//!
//! - **Health Monitor**: four read-only probes aggregated into a cached,
//!   single-flight snapshot
//! - **Auto-Fixer**: throttled dispatch of remediation strategies for
//!   recognised problems
//! - **Issue Queue**: capped in-memory record of remediations that failed
//! - **API**: `/api/health` and `/api/claude-issues` over Axum

pub mod api;
pub mod config;
pub mod health;
pub mod issues;
pub mod service;
pub mod store;

// Re-export configuration
pub use config::{ConfigError, ConfigOverrides, MonitorConfig};

// Re-export commonly used types
pub use health::{
    HealthCheck, HealthError, HealthMonitor, HealthStatus, HealthSummary, SystemHealth,
};
pub use issues::{Issue, IssueQueue, IssueSeverity, IssueStatus, IssueType, NewIssue};
pub use service::{MonitorHandle, MonitorService};
pub use store::{DataStore, StoreError, SupabaseStore};
