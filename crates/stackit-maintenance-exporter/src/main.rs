//! stackit-maintenance-exporter — STACKIT maintenance windows for Prometheus.
//!
//! Single binary that assembles:
//! - IaaS API client (one list-servers call per cycle)
//! - Gauge registry with the three maintenance families
//! - Maintenance collector loop (background task)
//! - HTTP server for `/metrics` and `/healthz`
//!
//! # Usage
//!
//! ```text
//! STACKIT_PROJECT_ID=... STACKIT_SERVICE_ACCOUNT_TOKEN=... stackit-maintenance-exporter --port 8080
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use maintenance_inventory::{ClientConfig, StackitClient};
use maintenance_metrics::{MaintenanceCollector, Registry, register_maintenance_metrics};

/// Environment variable holding the service account access token.
const TOKEN_ENV: &str = "STACKIT_SERVICE_ACCOUNT_TOKEN";

const DEFAULT_LOG_FILTER: &str =
    "info,stackit_maintenance_exporter=debug,maintenance_metrics=debug,maintenance_inventory=debug";

/// How long shutdown waits for an in-flight cycle.
const COLLECTOR_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(
    name = "stackit-maintenance-exporter",
    about = "Export STACKIT server maintenance windows as Prometheus metrics",
    version
)]
struct Cli {
    /// STACKIT project whose servers are exported.
    #[arg(long, env = "STACKIT_PROJECT_ID", value_parser = non_empty)]
    project_id: String,

    /// Port to listen on.
    #[arg(long, env = "EXPORTER_PORT", default_value = "8080")]
    port: u16,

    /// Poll interval in seconds.
    #[arg(
        long,
        env = "EXPORTER_INTERVAL_SECS",
        default_value = "60",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    interval: u64,

    /// STACKIT region of the IaaS API.
    #[arg(
        long,
        env = "STACKIT_REGION",
        default_value = maintenance_inventory::client::DEFAULT_REGION
    )]
    region: String,

    /// Override the IaaS API base URL (defaults to the regional endpoint).
    #[arg(long, env = "STACKIT_IAAS_API_URL")]
    api_url: Option<String>,

    /// Timeout for the list-servers request, in seconds.
    #[arg(
        long,
        env = "EXPORTER_REQUEST_TIMEOUT_SECS",
        default_value = "30",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    request_timeout: u64,

    /// Remove series of servers that disappeared from the inventory.
    #[arg(long, env = "EXPORTER_PRUNE_STALE_SERIES")]
    prune_stale_series: bool,

    /// Emit logs as JSON lines.
    #[arg(long, env = "EXPORTER_LOG_JSON")]
    log_json: bool,
}

fn non_empty(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        Err("must not be empty".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

impl Cli {
    fn client_config(&self, token: String) -> ClientConfig {
        let config = ClientConfig::for_region(&self.region, token)
            .with_timeout(Duration::from_secs(self.request_timeout));
        match &self.api_url {
            Some(url) => config.with_api_url(url.clone()),
            None => config,
        }
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    run(cli).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        project_id = %cli.project_id,
        "stackit-maintenance-exporter starting"
    );

    // ── Initialize subsystems ──────────────────────────────────

    let token = std::env::var(TOKEN_ENV).unwrap_or_default();
    let client = StackitClient::new(cli.client_config(token))
        .context("failed to initialize STACKIT client")?;
    info!(api_url = client.api_url(), region = %cli.region, "IaaS client initialized");

    let registry = Registry::new();
    register_maintenance_metrics(&registry);

    let collector = MaintenanceCollector::new(
        Arc::new(client),
        Arc::new(registry.clone()),
        cli.project_id.clone(),
        Duration::from_secs(cli.interval),
    )
    .with_pruning(cli.prune_stale_series);

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {addr}"))?;

    // ── Start background tasks ─────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let collector_handle = tokio::spawn(async move {
        collector.run(shutdown_rx).await;
    });

    // ── Start HTTP server ──────────────────────────────────────

    let router = maintenance_api::build_router(registry);
    info!(%addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await
        .context("HTTP server failed")?;

    match tokio::time::timeout(COLLECTOR_DRAIN_TIMEOUT, collector_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "collector task failed"),
        Err(_) => warn!("collector still busy after shutdown, abandoning in-flight cycle"),
    }

    info!("stackit-maintenance-exporter stopped");
    Ok(())
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    // Parsing with `try_parse_from` also reads the env bindings below, so
    // default checks go through the command definition instead.
    fn arg(id: &str) -> clap::Arg {
        let mut cmd = Cli::command();
        cmd.build();
        cmd.get_arguments()
            .find(|a| a.get_id() == id)
            .cloned()
            .unwrap_or_else(|| panic!("no argument {id}"))
    }

    fn default_of(id: &str) -> Option<String> {
        arg(id)
            .get_default_values()
            .first()
            .map(|v| v.to_string_lossy().into_owned())
    }

    fn env_of(id: &str) -> Option<String> {
        arg(id).get_env().map(|v| v.to_string_lossy().into_owned())
    }

    fn cli(project_id: &str) -> Cli {
        Cli {
            project_id: project_id.to_string(),
            port: 8080,
            interval: 60,
            region: "eu01".to_string(),
            api_url: None,
            request_timeout: 30,
            prune_stale_series: false,
            log_json: false,
        }
    }

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        assert_eq!(default_of("project_id"), None);
        assert_eq!(default_of("port").as_deref(), Some("8080"));
        assert_eq!(default_of("interval").as_deref(), Some("60"));
        assert_eq!(default_of("region").as_deref(), Some("eu01"));
        assert_eq!(default_of("request_timeout").as_deref(), Some("30"));
        assert_eq!(default_of("api_url"), None);
        assert_eq!(default_of("prune_stale_series").as_deref(), Some("false"));
        assert_eq!(default_of("log_json").as_deref(), Some("false"));
    }

    #[test]
    fn env_bindings() {
        assert_eq!(env_of("project_id").as_deref(), Some("STACKIT_PROJECT_ID"));
        assert_eq!(env_of("port").as_deref(), Some("EXPORTER_PORT"));
        assert_eq!(env_of("interval").as_deref(), Some("EXPORTER_INTERVAL_SECS"));
        assert_eq!(env_of("region").as_deref(), Some("STACKIT_REGION"));
        assert_eq!(env_of("api_url").as_deref(), Some("STACKIT_IAAS_API_URL"));
        assert_eq!(
            env_of("request_timeout").as_deref(),
            Some("EXPORTER_REQUEST_TIMEOUT_SECS")
        );
        assert_eq!(
            env_of("prune_stale_series").as_deref(),
            Some("EXPORTER_PRUNE_STALE_SERIES")
        );
        assert_eq!(env_of("log_json").as_deref(), Some("EXPORTER_LOG_JSON"));
    }

    #[test]
    fn overrides() {
        // Every value is passed explicitly, and flags take precedence over env.
        let cli = Cli::try_parse_from([
            "exporter",
            "--project-id",
            "proj-2",
            "--port",
            "9100",
            "--interval",
            "15",
            "--region",
            "eu02",
            "--api-url",
            "http://localhost:3000",
            "--request-timeout",
            "5",
            "--prune-stale-series",
            "--log-json",
        ])
        .unwrap();
        assert_eq!(cli.project_id, "proj-2");
        assert_eq!(cli.port, 9100);
        assert_eq!(cli.interval, 15);
        assert_eq!(cli.region, "eu02");
        assert!(cli.prune_stale_series);
        assert!(cli.log_json);

        let config = cli.client_config("token".to_string());
        assert_eq!(config.api_url, "http://localhost:3000");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn regional_endpoint_by_default() {
        let mut cli = cli("p");
        cli.region = "eu02".to_string();
        let config = cli.client_config("token".to_string());
        assert_eq!(config.api_url, "https://iaas.api.eu02.stackit.cloud");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn empty_project_id_rejected() {
        assert!(Cli::try_parse_from(["exporter", "--project-id", "  "]).is_err());
    }

    #[test]
    fn zero_interval_rejected() {
        assert!(Cli::try_parse_from(["exporter", "--project-id", "p", "--interval", "0"]).is_err());
    }

    #[test]
    fn missing_token_is_fatal() {
        assert!(StackitClient::new(cli("p").client_config(String::new())).is_err());
    }
}
