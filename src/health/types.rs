//! Health check result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of one surface, or of the whole system.
///
/// Variants are ordered by severity so the aggregate is a plain `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(self) -> bool {
        self == Self::Healthy
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        };
        f.write_str(s)
    }
}

/// Result of a single probe. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub status: HealthStatus,
    pub message: String,
    pub last_check: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixes: Option<Vec<String>>,
}

impl HealthCheck {
    pub fn new(status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            last_check: Utc::now(),
            fixes: None,
        }
    }

    pub fn healthy(message: impl Into<String>) -> Self {
        Self::new(HealthStatus::Healthy, message)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::new(HealthStatus::Degraded, message)
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::new(HealthStatus::Unhealthy, message)
    }

    /// Attach suggested remediation steps, in order.
    #[must_use]
    pub fn with_fixes<I, S>(mut self, fixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fixes = Some(fixes.into_iter().map(Into::into).collect());
        self
    }
}

/// The probed surfaces, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    DataStore,
    Database,
    Api,
    Sync,
}

impl Surface {
    pub const ALL: [Self; 4] = [Self::DataStore, Self::Database, Self::Api, Self::Sync];

    pub fn label(self) -> &'static str {
        match self {
            Self::DataStore => "data store",
            Self::Database => "database",
            Self::Api => "api",
            Self::Sync => "sync",
        }
    }
}

/// Aggregated snapshot of one check cycle.
///
/// `overall` is derived in [`SystemHealth::from_checks`] and the fields are
/// read-only outside this module, so the aggregate always matches the
/// individual checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    data_store: HealthCheck,
    database: HealthCheck,
    api: HealthCheck,
    sync: HealthCheck,
    overall: HealthStatus,
}

impl SystemHealth {
    pub fn from_checks(
        data_store: HealthCheck,
        database: HealthCheck,
        api: HealthCheck,
        sync: HealthCheck,
    ) -> Self {
        let overall = [&data_store, &database, &api, &sync]
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);
        Self {
            data_store,
            database,
            api,
            sync,
            overall,
        }
    }

    pub fn overall(&self) -> HealthStatus {
        self.overall
    }

    pub fn check(&self, surface: Surface) -> &HealthCheck {
        match surface {
            Surface::DataStore => &self.data_store,
            Surface::Database => &self.database,
            Surface::Api => &self.api,
            Surface::Sync => &self.sync,
        }
    }

    pub fn data_store(&self) -> &HealthCheck {
        &self.data_store
    }

    pub fn database(&self) -> &HealthCheck {
        &self.database
    }

    pub fn api(&self) -> &HealthCheck {
        &self.api
    }

    pub fn sync(&self) -> &HealthCheck {
        &self.sync
    }

    /// Surfaces whose check is not healthy. The aggregate is not counted.
    pub fn failing_surfaces(&self) -> Vec<Surface> {
        Surface::ALL
            .into_iter()
            .filter(|s| !self.check(*s).status.is_healthy())
            .collect()
    }

    pub fn summary(&self) -> HealthSummary {
        let failing = self.failing_surfaces();
        let message = if failing.is_empty() {
            "All systems operational".to_string()
        } else {
            let names: Vec<&str> = failing.iter().map(|s| s.label()).collect();
            format!("Issues detected: {}", names.join(", "))
        };
        HealthSummary {
            status: self.overall,
            message,
            issues: failing.len(),
        }
    }
}

/// Short form returned by `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub status: HealthStatus,
    pub message: String,
    pub issues: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(status: HealthStatus) -> HealthCheck {
        HealthCheck::new(status, "test")
    }

    #[test]
    fn test_overall_is_worst_status() {
        use HealthStatus::{Degraded, Healthy, Unhealthy};
        let statuses = [Healthy, Degraded, Unhealthy];

        for a in statuses {
            for b in statuses {
                for c in statuses {
                    for d in statuses {
                        let health =
                            SystemHealth::from_checks(check(a), check(b), check(c), check(d));
                        let all = [a, b, c, d];
                        let expected = if all.contains(&Unhealthy) {
                            Unhealthy
                        } else if all.contains(&Degraded) {
                            Degraded
                        } else {
                            Healthy
                        };
                        assert_eq!(health.overall(), expected, "checks {all:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_summary_all_operational() {
        let h = HealthStatus::Healthy;
        let health = SystemHealth::from_checks(check(h), check(h), check(h), check(h));
        let summary = health.summary();
        assert_eq!(summary.status, HealthStatus::Healthy);
        assert_eq!(summary.issues, 0);
        assert_eq!(summary.message, "All systems operational");
    }

    #[test]
    fn test_summary_lists_failing_surfaces() {
        let health = SystemHealth::from_checks(
            check(HealthStatus::Unhealthy),
            check(HealthStatus::Healthy),
            check(HealthStatus::Healthy),
            check(HealthStatus::Degraded),
        );
        let summary = health.summary();
        assert_eq!(summary.status, HealthStatus::Unhealthy);
        assert_eq!(summary.issues, 2);
        assert_eq!(summary.message, "Issues detected: data store, sync");
    }

    #[test]
    fn test_serialized_shape() {
        let health = SystemHealth::from_checks(
            check(HealthStatus::Healthy).with_fixes(["restart"]),
            check(HealthStatus::Healthy),
            check(HealthStatus::Healthy),
            check(HealthStatus::Healthy),
        );
        let v = serde_json::to_value(&health).unwrap();
        assert_eq!(v["overall"], "healthy");
        assert_eq!(v["dataStore"]["status"], "healthy");
        assert_eq!(v["dataStore"]["fixes"][0], "restart");
        assert!(v["dataStore"]["lastCheck"].is_string());
        assert!(v["database"].get("fixes").is_none());
    }
}
