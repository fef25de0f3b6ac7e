//! Kafka Viewer
//!
//! Read-mostly inspection service over many Kafka clusters:
//! - Topic listing with partitions, message counts and retention
//! - Message search across the partitions of a topic
//! - Consumer group lag per partition and per member
//! - Background refresh of the metadata caches

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use aggregator::{BrokerRegistry, Inspector, LagConfig, SearchConfig};
use api::{router, AppState};
use kafka_gateway::{GatewayConfig, KafkaConnector};
use telemetry::init_tracing_from_env;
use viewer_core::Cluster;
use worker::{RefreshConfig, RefreshScheduler};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    /// Clusters registered at startup
    #[serde(default)]
    clusters: Vec<Cluster>,

    #[serde(default)]
    gateway: GatewayConfig,

    #[serde(default)]
    search: SearchConfig,

    #[serde(default)]
    lag: LagConfig,

    #[serde(default)]
    refresh: RefreshConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            clusters: Vec::new(),
            gateway: GatewayConfig::default(),
            search: SearchConfig::default(),
            lag: LagConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // rustls 0.23+ requires explicit crypto provider selection before any TLS
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Kafka Viewer v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    info!(
        clusters = config.clusters.len(),
        request_timeout_ms = config.gateway.request_timeout_ms,
        refresh = config.refresh.enabled,
        "Loaded configuration"
    );

    let registry = Arc::new(
        BrokerRegistry::with_clusters(config.clusters.clone())
            .context("Invalid cluster in configuration")?,
    );
    if registry.list().is_empty() {
        warn!("No clusters configured; register one through POST /api/brokers");
    }

    let connector = Arc::new(KafkaConnector::new(config.gateway.clone()));
    let inspector = Arc::new(Inspector::new(
        registry,
        connector,
        config.search.clone(),
        config.lag.clone(),
    ));

    // Check clusters once so health is known before the first request
    let healthy = inspector.probe_clusters().await;
    info!(healthy, total = inspector.registry().active().len(), "Probed clusters");

    let scheduler = Arc::new(RefreshScheduler::new(config.refresh.clone(), inspector.clone()));
    let refresh_handles = scheduler.start();

    let app = router(AppState::new(inspector.clone()));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down...");

    for handle in refresh_handles {
        handle.abort();
    }

    info!(
        open_readers = inspector.search_engine().arena().live(),
        "Shutdown complete"
    );
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("VIEWER")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // A single bootstrap address is easier to pass than a cluster list
    if let Ok(bootstrap) = std::env::var("VIEWER_BOOTSTRAP") {
        config.clusters.push(bootstrap_cluster(&bootstrap)?);
    }

    Ok(config)
}

/// Parses `host:port` into a cluster the registry will number.
fn bootstrap_cluster(bootstrap: &str) -> Result<Cluster> {
    let (host, port) = bootstrap
        .trim()
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("VIEWER_BOOTSTRAP must be host:port, got '{}'", bootstrap))?;
    let port: u16 = port
        .parse()
        .with_context(|| format!("Invalid port in VIEWER_BOOTSTRAP '{}'", bootstrap))?;

    let tls = std::env::var("VIEWER_BOOTSTRAP_TLS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    Ok(Cluster::new(0, host, host, port).with_tls(tls))
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
