//! Protostar Server
//!
//! Scores posts for hateful content and serves accounts and a filtered feed.

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use protostar_classifiers::ScoringPipeline;
use protostar_server::{create_router, AppState, ServerConfig, Store};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "protostar-server")]
#[command(about = "Protostar hate-scoring post service", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml", env = "PROTOSTAR_CONFIG")]
    config: PathBuf,

    /// Store snapshot path, overrides the configuration file
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Listen address
    #[arg(short = 'l', long, default_value = "0.0.0.0")]
    listen: String,

    /// Listen port
    #[arg(short = 'P', long, default_value = "8080")]
    port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("Starting Protostar server");

    let mut config = ServerConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(store) = cli.store {
        config.store_path = Some(store);
    }
    info!("Configuration loaded successfully");
    info!("Model: {}", config.scoring.model_path.display());
    info!("Vocabulary: {}", config.scoring.vocabulary_path.display());

    let metrics_handle = init_metrics()?;

    // Missing artifacts or a schema mismatch are fatal here, never per request
    let pipeline =
        ScoringPipeline::from_config(&config.scoring).context("building scoring pipeline")?;

    let store = match &config.store_path {
        Some(path) => Store::open(path).context("opening store")?,
        None => {
            warn!("No store_path configured, posts will not survive a restart");
            Store::in_memory()
        }
    };

    let state = AppState::new(config, pipeline, store, metrics_handle);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", cli.listen, cli.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("protostar=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("protostar=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Install the Prometheus recorder and return the handle for `/metrics`
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "protostar_requests_total",
        "Total number of requests by endpoint"
    );
    metrics::describe_counter!("protostar_posts_total", "Posts stored, by label");
    metrics::describe_histogram!(
        "protostar_scoring_latency_us",
        metrics::Unit::Microseconds,
        "Scoring pipeline latency in microseconds"
    );
    metrics::describe_histogram!(
        "protostar_hate_score",
        "Display hate score (0-100) of scored texts"
    );
    metrics::describe_counter!("protostar_errors_total", "Total number of errors by type");

    info!("Metrics exporter initialized");
    Ok(handle)
}
