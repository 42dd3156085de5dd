//! Shared application state

use crate::accounts::SessionStore;
use crate::config::ServerConfig;
use crate::store::Store;
use metrics_exporter_prometheus::PrometheusHandle;
use protostar_classifiers::ScoringPipeline;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,

    /// Hate scoring pipeline, artifacts loaded once at startup
    pub pipeline: Arc<ScoringPipeline>,

    /// Users and posts
    pub store: Arc<Store>,

    /// Bearer-token login sessions
    pub sessions: Arc<SessionStore>,

    /// Prometheus metrics handle for rendering
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        pipeline: ScoringPipeline,
        store: Store,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        let sessions = SessionStore::new(
            chrono::Duration::seconds(config.sessions.ttl_secs),
            chrono::Duration::seconds(config.sessions.remember_ttl_secs),
        );

        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            store: Arc::new(store),
            sessions: Arc::new(sessions),
            metrics_handle,
        }
    }
}
