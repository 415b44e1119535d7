//! Taskdeck Monitor: health check and auto-remediation server
//!
//! # Usage
//!
//! ```bash
//! # Run against a Supabase project
//! SUPABASE_URL=https://xyz.supabase.co SUPABASE_ANON_KEY=... cargo run --release
//!
//! # Poll in the background every 60s and log as JSON
//! cargo run --release -- --poll-interval 60 --log-json
//! ```
//!
//! # Environment Variables
//!
//! | Variable                   | Required | Description                              |
//! |----------------------------|----------|------------------------------------------|
//! | `SUPABASE_URL`             | Yes      | Data store endpoint (or `NEXT_PUBLIC_SUPABASE_URL`) |
//! | `SUPABASE_ANON_KEY`        | Yes      | Data store key (or `SUPABASE_SERVICE_ROLE_KEY`) |
//! | `MONITOR_CONFIG`           | No       | Path to a `monitor.toml`                 |
//! | `MONITOR_CORS_ORIGINS`     | No       | Comma-separated allowed origins          |
//! | `RUST_LOG`                 | No       | Logging filter (default: info)           |
//!
//! Without the two data store variables the server still starts; every
//! probe then reports `unhealthy` / "not configured".

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use taskdeck_monitor::{api, ConfigOverrides, DataStore, MonitorConfig, MonitorService, SupabaseStore};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "taskdeck-monitor", about = "Taskdeck data store health monitor")]
struct CliArgs {
    /// Path to a TOML config file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Port to listen on (default: 3001)
    #[arg(long, short)]
    port: Option<u16>,

    /// Bind address (overrides --port)
    #[arg(long)]
    bind_address: Option<String>,

    /// Data store endpoint URL
    #[arg(long)]
    data_store_url: Option<String>,

    /// Data store access key
    #[arg(long)]
    data_store_key: Option<String>,

    /// Refresh the health snapshot in the background every N seconds
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Emit logs as JSON
    #[arg(long, env = "MONITOR_LOG_JSON")]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,taskdeck_monitor=debug"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = CliArgs::parse();
    init_tracing(args.log_json);

    let config = MonitorConfig::load(ConfigOverrides {
        config_path: args.config,
        bind_address: args.bind_address,
        port: args.port,
        data_store_url: args.data_store_url,
        data_store_key: args.data_store_key,
        poll_interval_secs: args.poll_interval,
    })
    .context("Failed to load monitor configuration")?;

    let store: Option<Arc<dyn DataStore>> = SupabaseStore::from_config(&config)
        .context("Failed to build data store client")?
        .map(|s| Arc::new(s) as Arc<dyn DataStore>);

    info!(
        bind = %config.bind_address,
        data_store_configured = store.is_some(),
        primary_table = %config.primary_table,
        sync_table = %config.sync_table,
        "Starting Taskdeck Monitor"
    );

    let bind_address = config.bind_address.clone();
    let service = MonitorService::start(config, store);
    let app = api::create_app(service.handle());

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    info!(address = %bind_address, "Monitor listening");

    let token = service.shutdown_token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                () = shutdown_signal() => {}
                () = token.cancelled() => {}
            }
        })
        .await
        .context("HTTP server error")?;

    service.shutdown().await;
    info!("Taskdeck Monitor shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
