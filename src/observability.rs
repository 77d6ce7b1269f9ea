//! Observability module for centralized metrics, tracing, and logging setup.
//!
//! This module provides:
//! - Metrics collection and Prometheus export
//! - Distributed tracing with OpenTelemetry
//! - Structured logging with configurable levels
//! - Health check endpoints for monitoring

pub mod health_checks;
pub mod metrics;
pub mod tracing_mod;

use anyhow::Result;

pub use health_checks::ReadinessContext;
pub use metrics::{record_error_metrics, record_telegram_message};
pub use tracing_mod::{catalog_span, quiz_span, telegram_span};

use crate::observability_config::ObservabilityConfig;

/// Initialize logging and trace export. Call before anything logs.
pub async fn init_tracing_stack(config: &ObservabilityConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid observability configuration: {}", e))?;

    tracing_mod::init_tracing_with_config(config)?;
    tracing_mod::init_opentelemetry_tracing_with_config(config).await?;
    Ok(())
}

/// Install the Prometheus recorder and start the metrics/health server
pub async fn init_metrics_server(
    config: &ObservabilityConfig,
    readiness: ReadinessContext,
) -> Result<()> {
    let metrics_handle = metrics::init_metrics_with_config(config)?;
    metrics::start_metrics_server_with_health_checks(metrics_handle, config.metrics_port, readiness)
        .await?;

    tracing::info!(
        environment = %config.environment,
        otlp_endpoint = ?config.otlp_endpoint,
        metrics_port = %config.metrics_port,
        "Observability stack initialized successfully"
    );
    Ok(())
}
