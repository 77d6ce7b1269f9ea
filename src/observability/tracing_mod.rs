//! Tracing and logging setup module.
//!
//! This module provides:
//! - Structured logging configuration
//! - OpenTelemetry distributed tracing
//! - Tracing span creation utilities

use anyhow::Result;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::Sampler;
use opentelemetry_sdk::Resource;
use tracing_subscriber::prelude::*;

use crate::observability_config::{LogFormat, ObservabilityConfig};

/// Initialize structured logging with tracing and configuration
pub fn init_tracing_with_config(config: &ObservabilityConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("poll_quiz_bot={}", config.log_level).parse()?)
        .add_directive("teloxide=warn".parse()?)
        .add_directive("hyper=warn".parse()?);

    // Pretty for development, JSON for others
    match config.effective_log_format() {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_thread_names(false),
                )
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_thread_names(true),
                )
                .try_init()?;
        }
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        log_format = ?config.effective_log_format(),
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Initialize OpenTelemetry distributed tracing when an OTLP endpoint is configured
pub async fn init_opentelemetry_tracing_with_config(config: &ObservabilityConfig) -> Result<()> {
    let Some(endpoint) = &config.otlp_endpoint else {
        tracing::info!("OpenTelemetry tracing disabled (no OTLP endpoint configured)");
        return Ok(());
    };

    let otlp_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.clone())
        .build()?;

    let sampler = if config.enable_trace_sampling {
        Sampler::TraceIdRatioBased(config.trace_sampling_ratio)
    } else {
        Sampler::AlwaysOn
    };

    let resource = Resource::builder()
        .with_attributes(
            config
                .tags
                .iter()
                .map(|(k, v)| KeyValue::new(k.clone(), v.clone())),
        )
        .build();

    let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(otlp_exporter)
        .with_sampler(sampler)
        .with_resource(resource)
        .build();

    global::set_tracer_provider(tracer_provider);

    tracing::info!(
        otlp_endpoint = %endpoint,
        trace_sampling_enabled = %config.enable_trace_sampling,
        trace_sampling_ratio = %config.trace_sampling_ratio,
        "OpenTelemetry tracing initialized with OTLP export"
    );
    Ok(())
}

/// Create a span for Telegram bot operations
pub fn telegram_span(operation: &str, user_id: Option<u64>) -> tracing::Span {
    tracing::info_span!(
        "telegram_operation",
        operation = operation,
        user_id = user_id,
        component = "telegram"
    )
}

/// Create a span for quiz engine operations
pub fn quiz_span(operation: &str, session_id: Option<u64>) -> tracing::Span {
    tracing::info_span!(
        "quiz_operation",
        operation = operation,
        session_id = session_id,
        component = "quiz"
    )
}

/// Create a span for question bank file operations
pub fn catalog_span(operation: &str, path: &str) -> tracing::Span {
    tracing::info_span!(
        "catalog_operation",
        operation = operation,
        path = path,
        component = "question_bank"
    )
}
