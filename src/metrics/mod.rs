//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Endpoint connection attempts and failover exhaustion
//! - Dry run outcomes
//! - Pool selection results
//! - Transaction terminal outcomes and open subscriptions

use crate::config::MetricsConfig;
use crate::error::{XchainError, XchainResult};

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};
use std::net::SocketAddr;
use tracing::{error, info};

lazy_static! {
    // Connection metrics
    pub static ref CONNECT_ATTEMPTS: CounterVec = register_counter_vec!(
        "xchain_connect_attempts_total",
        "Connection attempts by outcome (success, timeout, error)",
        &["chain", "outcome"]
    ).unwrap();

    pub static ref CONNECTIONS_EXHAUSTED: CounterVec = register_counter_vec!(
        "xchain_connections_exhausted_total",
        "Connects that ran out of attempts",
        &["chain"]
    ).unwrap();

    pub static ref CONNECT_LATENCY: HistogramVec = register_histogram_vec!(
        "xchain_connect_latency_seconds",
        "Time from first attempt to an established connection",
        &["chain"],
        vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();

    // Dry run metrics
    pub static ref DRY_RUNS: CounterVec = register_counter_vec!(
        "xchain_dry_runs_total",
        "Transfer dry runs by outcome",
        &["outcome"]
    ).unwrap();

    // Pool metrics
    pub static ref POOL_SELECTIONS: CounterVec = register_counter_vec!(
        "xchain_pool_selections_total",
        "Pool selections by result (found, not_found, failed)",
        &["result"]
    ).unwrap();

    // Transaction metrics
    pub static ref TX_OUTCOMES: CounterVec = register_counter_vec!(
        "xchain_tx_outcomes_total",
        "Submitted transactions by terminal state",
        &["chain", "outcome"]
    ).unwrap();

    pub static ref ACTIVE_SUBSCRIPTIONS: Gauge = register_gauge!(
        "xchain_active_subscriptions",
        "Lifecycle event subscriptions currently held"
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    /// A server for the configured port, or `None` when metrics are disabled
    pub fn from_config(config: &MetricsConfig) -> Option<Self> {
        config.enabled.then(|| Self::new(config.port))
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn router() -> Router {
        Router::new().route("/metrics", get(metrics_handler))
    }

    pub async fn run(&self) -> XchainResult<()> {
        let app = Self::router();

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| XchainError::Internal(format!("metrics bind failed: {}", e)))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| XchainError::Internal(format!("metrics server failed: {}", e)))?;

        Ok(())
    }
}

async fn metrics_handler() -> Result<String, (StatusCode, String)> {
    gather_text().map_err(|e| {
        error!("Failed to encode metrics: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}

/// Render every registered metric in the Prometheus text format
pub fn gather_text() -> XchainResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| XchainError::Internal(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| XchainError::Internal(e.to_string()))
}

// Helper functions to record metrics

pub fn record_connect_attempt(chain: &str, outcome: &str) {
    CONNECT_ATTEMPTS.with_label_values(&[chain, outcome]).inc();
}

pub fn record_connections_exhausted(chain: &str) {
    CONNECTIONS_EXHAUSTED.with_label_values(&[chain]).inc();
}

pub fn record_connect_latency(chain: &str, latency_secs: f64) {
    CONNECT_LATENCY
        .with_label_values(&[chain])
        .observe(latency_secs);
}

pub fn record_dry_run(outcome: &str) {
    DRY_RUNS.with_label_values(&[outcome]).inc();
}

pub fn record_pool_selection(result: &str) {
    POOL_SELECTIONS.with_label_values(&[result]).inc();
}

pub fn record_tx_outcome(chain: &str, outcome: &str) {
    TX_OUTCOMES.with_label_values(&[chain, outcome]).inc();
}

pub fn record_subscription_opened() {
    ACTIVE_SUBSCRIPTIONS.inc();
}

pub fn record_subscription_released() {
    ACTIVE_SUBSCRIPTIONS.dec();
}
