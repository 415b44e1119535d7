//! Monitor configuration: TOML file, environment variables, CLI overrides
//!
//! Precedence (lowest to highest):
//! 1. Built-in defaults
//! 2. TOML file (`--config` or `$MONITOR_CONFIG`, else `./monitor.toml` if present)
//! 3. Environment variables (`SUPABASE_URL`, `SUPABASE_ANON_KEY`, `MONITOR_*`)
//! 4. CLI flags

pub mod validation;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Default config file looked up in the working directory.
const LOCAL_CONFIG_FILE: &str = "monitor.toml";

/// Health monitor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Bind address for the HTTP server (e.g., "0.0.0.0:3001")
    pub bind_address: String,
    /// Remote data store endpoint (Supabase project URL)
    pub data_store_url: Option<String>,
    /// Remote data store access key
    pub data_store_key: Option<String>,
    /// Table probed for row presence
    pub primary_table: String,
    /// Table probed for sync parity
    pub sync_table: String,
    /// How long a health snapshot is reused (default: 30)
    pub cache_ttl_secs: u64,
    /// Minimum interval between auto-fix attempts (default: 60)
    pub auto_fix_cooldown_secs: u64,
    /// Round trips at or above this are reported as degraded (default: 5000)
    pub slow_probe_threshold_ms: u64,
    /// HTTP client timeout for data store requests (default: 10)
    pub request_timeout_secs: u64,
    /// Maximum number of issues retained in the queue (default: 50)
    pub issue_capacity: usize,
    /// Resolved issues older than this are purged (default: 24)
    pub issue_retention_hours: u64,
    /// Interval of the background issue cleanup task (default: 3600)
    pub cleanup_interval_secs: u64,
    /// Background polling interval; `None` disables polling
    pub poll_interval_secs: Option<u64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3001".to_string(),
            data_store_url: None,
            data_store_key: None,
            primary_table: "users".to_string(),
            sync_table: "tasks".to_string(),
            cache_ttl_secs: 30,
            auto_fix_cooldown_secs: 60,
            slow_probe_threshold_ms: 5000,
            request_timeout_secs: 10,
            issue_capacity: 50,
            issue_retention_hours: 24,
            cleanup_interval_secs: 3600,
            poll_interval_secs: None,
        }
    }
}

/// CLI-level overrides applied on top of file and environment values.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub data_store_url: Option<String>,
    pub data_store_key: Option<String>,
    pub poll_interval_secs: Option<u64>,
}

impl MonitorConfig {
    /// Build the effective configuration from all layers and validate it.
    pub fn load(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = match Self::locate_file(overrides.config_path.as_deref()) {
            Some(path) => {
                let config = Self::load_from_file(&path)?;
                info!(path = %path.display(), "Loaded monitor config");
                config
            }
            None => {
                info!("No monitor.toml found, using built-in defaults");
                Self::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    fn locate_file(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Ok(path) = std::env::var("MONITOR_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                return Some(p);
            }
            warn!(path = %path, "MONITOR_CONFIG points to non-existent file, ignoring");
        }
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        local.exists().then_some(local)
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        for w in validation::unknown_keys(&contents) {
            warn!(key = %w, "Unknown key in monitor config");
        }
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Apply environment variables. The lookup is injected so tests do not
    /// have to mutate the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(*k).filter(|v| !v.is_empty()));

        if let Some(url) = first(&["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"]) {
            self.data_store_url = Some(url);
        }
        if let Some(key) = first(&[
            "SUPABASE_ANON_KEY",
            "NEXT_PUBLIC_SUPABASE_ANON_KEY",
            "SUPABASE_SERVICE_ROLE_KEY",
        ]) {
            self.data_store_key = Some(key);
        }
        if let Some(addr) = first(&["MONITOR_BIND_ADDRESS"]) {
            self.bind_address = addr;
        }
        if let Some(table) = first(&["MONITOR_PRIMARY_TABLE"]) {
            self.primary_table = table;
        }
        if let Some(table) = first(&["MONITOR_SYNC_TABLE"]) {
            self.sync_table = table;
        }

        let parse = |key: &str| {
            let raw = lookup(key)?;
            match raw.parse::<u64>() {
                Ok(n) => Some(n),
                Err(_) => {
                    warn!(key, value = %raw, "Ignoring non-numeric environment override");
                    None
                }
            }
        };
        if let Some(n) = parse("MONITOR_CACHE_TTL_SECS") {
            self.cache_ttl_secs = n;
        }
        if let Some(n) = parse("MONITOR_AUTO_FIX_COOLDOWN_SECS") {
            self.auto_fix_cooldown_secs = n;
        }
        if let Some(n) = parse("MONITOR_SLOW_PROBE_THRESHOLD_MS") {
            self.slow_probe_threshold_ms = n;
        }
        if let Some(n) = parse("MONITOR_ISSUE_CAPACITY") {
            self.issue_capacity = usize::try_from(n).unwrap_or(usize::MAX);
        }
        if let Some(n) = parse("MONITOR_POLL_INTERVAL_SECS") {
            self.poll_interval_secs = Some(n);
        }
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(addr) = overrides.bind_address {
            self.bind_address = addr;
        } else if let Some(p) = overrides.port {
            self.bind_address = format!("0.0.0.0:{p}");
        }
        if overrides.data_store_url.is_some() {
            self.data_store_url = overrides.data_store_url;
        }
        if overrides.data_store_key.is_some() {
            self.data_store_key = overrides.data_store_key;
        }
        if overrides.poll_interval_secs.is_some() {
            self.poll_interval_secs = overrides.poll_interval_secs;
        }
    }

    /// Both connection parameters are present.
    pub fn data_store_configured(&self) -> bool {
        self.data_store_url.as_deref().is_some_and(|s| !s.is_empty())
            && self.data_store_key.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn auto_fix_cooldown(&self) -> Duration {
        Duration::from_secs(self.auto_fix_cooldown_secs)
    }

    pub fn slow_probe_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_probe_threshold_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn issue_retention(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::try_from(self.issue_retention_hours).unwrap_or(i64::MAX))
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_secs.map(Duration::from_secs)
    }

    /// Range checks. All problems are collected before failing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let errors = validation::range_errors(self);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, std::io::Error),
    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, toml::de::Error),
    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}
