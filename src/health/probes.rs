//! The four surface probes.
//!
//! Each probe is read-only and converts every failure into a
//! [`HealthCheck`]; none of them return errors. `None` for the store means
//! the connection parameters are not configured.

use super::types::HealthCheck;
use crate::store::DataStore;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

pub(crate) const NOT_CONFIGURED: &str = "Data store not configured";

fn not_configured() -> HealthCheck {
    HealthCheck::unhealthy(NOT_CONFIGURED).with_fixes([
        "Set SUPABASE_URL (or NEXT_PUBLIC_SUPABASE_URL)",
        "Set SUPABASE_ANON_KEY (or SUPABASE_SERVICE_ROLE_KEY)",
    ])
}

/// Reachability of the remote store, classified by round-trip time.
pub async fn probe_data_store(store: Option<&dyn DataStore>, slow_threshold: Duration) -> HealthCheck {
    let Some(store) = store else {
        return not_configured();
    };

    let started = Instant::now();
    let result = store.ping().await;
    let elapsed = started.elapsed();
    let ms = elapsed.as_millis();

    match result {
        Ok(()) if elapsed < slow_threshold => {
            debug!(latency_ms = ms, "Data store reachable");
            HealthCheck::healthy(format!("Connected ({ms}ms)"))
        }
        Ok(()) => {
            warn!(latency_ms = ms, "Data store responding slowly");
            HealthCheck::degraded(format!("Slow response ({ms}ms)")).with_fixes([
                "Check network latency to the data store",
                "Check the data store's load and connection limits",
            ])
        }
        Err(e) => {
            warn!(error = %e, "Data store unreachable");
            HealthCheck::unhealthy(format!("Connection failed: {e}")).with_fixes([
                "Verify the data store URL and access key",
                "Check that the project is not paused",
            ])
        }
    }
}

/// Presence of rows in the primary table.
pub async fn probe_database(store: Option<&dyn DataStore>, table: &str) -> HealthCheck {
    let Some(store) = store else {
        return not_configured();
    };

    match store.count_rows(table).await {
        Ok(0) => HealthCheck::degraded(format!("Table '{table}' has no rows"))
            .with_fixes([format!("Seed the '{table}' table")]),
        Ok(n) => HealthCheck::healthy(format!("{n} rows in '{table}'")),
        Err(e) => {
            warn!(table, error = %e, "Database probe failed");
            HealthCheck::unhealthy(format!("Database error: {e}")).with_fixes([
                format!("Create the '{table}' table if it is missing"),
                "Check row-level security policies for the access key".to_string(),
            ])
        }
    }
}

/// Reduced API check. It does not call the API layer (which depends on this
/// monitor); it only confirms the data store prerequisite is configured.
pub fn probe_api(store: Option<&dyn DataStore>) -> HealthCheck {
    if store.is_some() {
        HealthCheck::healthy("API prerequisites satisfied")
    } else {
        HealthCheck::unhealthy(format!("API unavailable: {NOT_CONFIGURED}"))
    }
}

/// Remote row count of the synced table against the expectation that it is
/// non-empty.
pub async fn probe_sync(store: Option<&dyn DataStore>, table: &str) -> HealthCheck {
    let Some(store) = store else {
        return not_configured();
    };

    match store.count_rows(table).await {
        Ok(0) => HealthCheck::degraded(format!(
            "Sync mismatch: remote '{table}' is empty"
        ))
        .with_fixes(["Run the data sync job"]),
        Ok(n) => HealthCheck::healthy(format!("{n} rows synced in '{table}'")),
        Err(e) => {
            warn!(table, error = %e, "Sync probe failed");
            HealthCheck::unhealthy(format!("Sync check failed: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::types::HealthStatus;
    use crate::store::StoreError;
    use async_trait::async_trait;

    struct FakeStore {
        latency: Duration,
        ping_error: Option<&'static str>,
        count: Result<u64, &'static str>,
    }

    impl FakeStore {
        fn ok(count: u64) -> Self {
            Self {
                latency: Duration::from_millis(20),
                ping_error: None,
                count: Ok(count),
            }
        }
    }

    #[async_trait]
    impl DataStore for FakeStore {
        async fn ping(&self) -> Result<(), StoreError> {
            tokio::time::sleep(self.latency).await;
            match self.ping_error {
                Some(msg) => Err(StoreError::Query(msg.to_string())),
                None => Ok(()),
            }
        }

        async fn count_rows(&self, _table: &str) -> Result<u64, StoreError> {
            self.count.map_err(|msg| StoreError::Query(msg.to_string()))
        }
    }

    const THRESHOLD: Duration = Duration::from_millis(5000);

    #[tokio::test(start_paused = true)]
    async fn test_fast_ping_is_healthy() {
        let store = FakeStore::ok(1);
        let check = probe_data_store(Some(&store), THRESHOLD).await;
        assert_eq!(check.status, HealthStatus::Healthy);
        assert!(check.fixes.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_ping_is_degraded() {
        let store = FakeStore {
            latency: Duration::from_millis(6000),
            ..FakeStore::ok(1)
        };
        let check = probe_data_store(Some(&store), THRESHOLD).await;
        assert_eq!(check.status, HealthStatus::Degraded);
        assert!(check.message.contains("6000ms"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_error_is_unhealthy() {
        let store = FakeStore {
            ping_error: Some("connection refused"),
            ..FakeStore::ok(1)
        };
        let check = probe_data_store(Some(&store), THRESHOLD).await;
        assert_eq!(check.status, HealthStatus::Unhealthy);
        assert!(check.message.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_unconfigured_probes_are_unhealthy() {
        assert_eq!(probe_data_store(None, THRESHOLD).await.status, HealthStatus::Unhealthy);
        assert_eq!(probe_database(None, "users").await.message, NOT_CONFIGURED);
        assert_eq!(probe_api(None).status, HealthStatus::Unhealthy);
        assert_eq!(probe_sync(None, "tasks").await.status, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_database_classification() {
        let missing = FakeStore {
            count: Err("relation \"public.users\" does not exist"),
            ..FakeStore::ok(0)
        };
        let check = probe_database(Some(&missing), "users").await;
        assert_eq!(check.status, HealthStatus::Unhealthy);
        assert!(check.message.contains("relation \"public.users\" does not exist"));

        let empty = FakeStore::ok(0);
        assert_eq!(probe_database(Some(&empty), "users").await.status, HealthStatus::Degraded);

        let full = FakeStore::ok(12);
        let check = probe_database(Some(&full), "users").await;
        assert_eq!(check.status, HealthStatus::Healthy);
        assert!(check.message.starts_with("12 rows"));
    }

    #[tokio::test]
    async fn test_sync_empty_reports_mismatch() {
        let empty = FakeStore::ok(0);
        let check = probe_sync(Some(&empty), "tasks").await;
        assert_eq!(check.status, HealthStatus::Degraded);
        assert!(check.message.contains("mismatch"));

        let broken = FakeStore {
            count: Err("permission denied"),
            ..FakeStore::ok(0)
        };
        assert_eq!(probe_sync(Some(&broken), "tasks").await.status, HealthStatus::Unhealthy);
    }

    #[test]
    fn test_api_probe_with_store() {
        let store = FakeStore::ok(1);
        assert_eq!(probe_api(Some(&store)).status, HealthStatus::Healthy);
    }
}
