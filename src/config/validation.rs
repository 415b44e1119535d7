//! Config validation: unknown-key detection and range checks.
//!
//! Unknown keys only produce warnings so older config files keep loading.
//! Range problems are fatal and collected in one pass.

use super::MonitorConfig;

/// Every key accepted at the top level of `monitor.toml`.
const KNOWN_KEYS: &[&str] = &[
    "bind_address",
    "data_store_url",
    "data_store_key",
    "primary_table",
    "sync_table",
    "cache_ttl_secs",
    "auto_fix_cooldown_secs",
    "slow_probe_threshold_ms",
    "request_timeout_secs",
    "issue_capacity",
    "issue_retention_hours",
    "cleanup_interval_secs",
    "poll_interval_secs",
];

/// Top-level keys in `contents` that `MonitorConfig` does not know.
///
/// Unparseable input yields no warnings; the real parse reports the error.
pub fn unknown_keys(contents: &str) -> Vec<String> {
    let Ok(toml::Value::Table(table)) = contents.parse::<toml::Value>() else {
        return Vec::new();
    };
    table
        .keys()
        .filter(|k| !KNOWN_KEYS.contains(&k.as_str()))
        .cloned()
        .collect()
}

/// Collect every out-of-range value.
pub fn range_errors(config: &MonitorConfig) -> Vec<String> {
    let mut errors = Vec::new();

    let positive = [
        ("cache_ttl_secs", config.cache_ttl_secs),
        ("slow_probe_threshold_ms", config.slow_probe_threshold_ms),
        ("request_timeout_secs", config.request_timeout_secs),
        ("issue_retention_hours", config.issue_retention_hours),
        ("cleanup_interval_secs", config.cleanup_interval_secs),
    ];
    for (name, value) in positive {
        if value == 0 {
            errors.push(format!("{name} must be greater than 0"));
        }
    }
    if config.issue_capacity == 0 {
        errors.push("issue_capacity must be greater than 0".to_string());
    }
    if config.poll_interval_secs == Some(0) {
        errors.push("poll_interval_secs must be greater than 0 when set".to_string());
    }

    if let Some(url) = config.data_store_url.as_deref() {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(format!("data_store_url must be an http(s) URL, got '{url}'"));
        }
    }

    for (name, table) in [
        ("primary_table", &config.primary_table),
        ("sync_table", &config.sync_table),
    ] {
        let valid = !table.is_empty()
            && table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if !valid {
            errors.push(format!("{name} '{table}' is not a valid table name"));
        }
    }

    errors
}
