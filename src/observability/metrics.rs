//! Metrics collection and Prometheus export module.
//!
//! This module provides:
//! - Rate limiting and optional bearer authentication for the HTTP endpoint
//! - The Prometheus metrics and health server
//! - Recording functions for quiz, Telegram and health metrics

use anyhow::Result;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

use super::health_checks::{perform_readiness_checks, ReadinessContext};
use crate::observability_config::ObservabilityConfig;

type HttpResponse = hyper::Response<String>;

/// Simple per-IP rate limiter for HTTP requests
#[derive(Debug)]
pub struct RateLimiter {
    requests: Mutex<HashMap<String, Vec<Instant>>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Check if request is allowed for the given IP
    pub fn is_allowed(&self, ip: &str) -> bool {
        let now = Instant::now();
        let mut requests = self.requests.lock();
        let client_requests = requests.entry(ip.to_string()).or_default();

        client_requests.retain(|&time| now.duration_since(time) < self.window);

        if client_requests.len() >= self.max_requests as usize {
            return false;
        }

        client_requests.push(now);
        true
    }
}

/// Check the bearer token against `METRICS_AUTH_TOKEN` when one is set
pub fn check_auth<B>(req: &hyper::Request<B>) -> bool {
    let expected_token = match std::env::var("METRICS_AUTH_TOKEN") {
        Ok(token) if !token.is_empty() => token,
        _ => return true,
    };

    req.headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected_token)
}

fn status_response(status: hyper::StatusCode, body: impl Into<String>) -> HttpResponse {
    let mut response = hyper::Response::new(body.into());
    *response.status_mut() = status;
    response
}

/// Initialize metrics collection with the Prometheus recorder
pub fn init_metrics_with_config(config: &ObservabilityConfig) -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    tracing::info!(
        environment = %config.environment,
        metrics_port = config.metrics_port,
        "Metrics collection initialized"
    );
    Ok(handle)
}

async fn route(
    req: hyper::Request<hyper::body::Incoming>,
    metrics_handle: PrometheusHandle,
    readiness: Arc<ReadinessContext>,
) -> HttpResponse {
    let started = Instant::now();
    let method = req.method().to_string();

    let response = match (req.method(), req.uri().path()) {
        (&hyper::Method::GET, "/metrics") => {
            let mut response = hyper::Response::new(metrics_handle.render());
            response.headers_mut().insert(
                "content-type",
                hyper::header::HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
            );
            response
        }
        (&hyper::Method::GET, "/health/live") => hyper::Response::new("OK".to_string()),
        (&hyper::Method::GET, "/health/ready") => {
            let report = perform_readiness_checks(&readiness);
            let status = if report.ready {
                hyper::StatusCode::OK
            } else {
                hyper::StatusCode::SERVICE_UNAVAILABLE
            };
            let body = serde_json::to_string(&report)
                .unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e));
            let mut response = status_response(status, body);
            response.headers_mut().insert(
                "content-type",
                hyper::header::HeaderValue::from_static("application/json"),
            );
            response
        }
        _ => status_response(hyper::StatusCode::NOT_FOUND, "Not Found"),
    };

    record_request_metrics(&method, response.status().as_u16(), started.elapsed());
    response
}

/// Start the metrics server with `/metrics`, `/health/live` and `/health/ready`
pub async fn start_metrics_server_with_health_checks(
    metrics_handle: PrometheusHandle,
    port: u16,
    readiness: ReadinessContext,
) -> Result<()> {
    // Localhost only unless explicitly opened up
    let bind_all = std::env::var("METRICS_BIND_ALL_INTERFACES")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    let addr = if bind_all {
        SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port)
    } else {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    };

    // 10 requests per minute per IP
    let rate_limiter = Arc::new(RateLimiter::new(10, 60));
    let readiness = Arc::new(readiness);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, bind_all, "Metrics server listening");

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let metrics_handle = metrics_handle.clone();
                    let readiness = readiness.clone();
                    let rate_limiter = rate_limiter.clone();

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);

                        let service = hyper::service::service_fn(
                            move |req: hyper::Request<hyper::body::Incoming>| {
                                let metrics_handle = metrics_handle.clone();
                                let readiness = readiness.clone();
                                let peer_ip = peer_addr.ip().to_string();
                                let rate_limiter = rate_limiter.clone();
                                async move {
                                    if !rate_limiter.is_allowed(&peer_ip) {
                                        return Ok::<_, std::convert::Infallible>(status_response(
                                            hyper::StatusCode::TOO_MANY_REQUESTS,
                                            "Rate limit exceeded",
                                        ));
                                    }

                                    if !check_auth(&req) {
                                        let mut response = status_response(
                                            hyper::StatusCode::UNAUTHORIZED,
                                            "Unauthorized",
                                        );
                                        response.headers_mut().insert(
                                            "www-authenticate",
                                            hyper::header::HeaderValue::from_static("Bearer"),
                                        );
                                        return Ok(response);
                                    }

                                    Ok(route(req, metrics_handle, readiness).await)
                                }
                            },
                        );

                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await
                        {
                            crate::errors::error_logging::log_network_error(
                                &err,
                                "serve_http_connection",
                                Some(&peer_addr.to_string()),
                                None,
                            );
                        }
                    });
                }
                Err(e) => {
                    crate::errors::error_logging::log_network_error(
                        &e,
                        "accept_tcp_connection",
                        Some(&addr.to_string()),
                        None,
                    );
                }
            }
        }
    });

    Ok(())
}

/// Record HTTP request metrics for the metrics server itself
pub fn record_request_metrics(method: &str, status: u16, duration: Duration) {
    let method = method.to_string();
    let status = status.to_string();
    metrics::counter!("requests_total", "method" => method, "status" => status).increment(1);
    metrics::histogram!("request_duration_seconds").record(duration.as_secs_f64());
}

/// Record health check metrics
pub fn record_health_check_metrics(check_type: &str, success: bool, duration: Duration) {
    let check_type = check_type.to_string();
    let result = if success { "success" } else { "failure" };
    metrics::counter!("health_checks_total", "type" => check_type.clone(), "result" => result)
        .increment(1);
    metrics::histogram!("health_check_duration_seconds", "type" => check_type.clone())
        .record(duration.as_secs_f64());
    metrics::gauge!("health_check_status", "type" => check_type).set(if success {
        1.0
    } else {
        0.0
    });
}

/// Record an error by type and component
pub fn record_error_metrics(error_type: &str, component: &str) {
    let error_type = error_type.to_string();
    let component = component.to_string();
    metrics::counter!("errors_total", "type" => error_type, "component" => component).increment(1);
}

/// Record application startup metrics
pub fn record_startup_metrics(duration: Duration) {
    metrics::histogram!("application_startup_duration_seconds").record(duration.as_secs_f64());
    metrics::counter!("application_starts_total").increment(1);
}

/// Record Telegram update processing
pub fn record_telegram_message(message_type: &str) {
    let message_type = message_type.to_string();
    metrics::counter!("telegram_messages_total", "type" => message_type).increment(1);
}

/// Record a quiz launch
pub fn record_session_started(question_count: usize) {
    metrics::counter!("quiz_sessions_started_total").increment(1);
    metrics::histogram!("quiz_session_questions").record(question_count as f64);
}

/// Record one poll publish attempt
pub fn record_poll_dispatch(success: bool) {
    let result = if success { "published" } else { "skipped" };
    metrics::counter!("quiz_polls_dispatched_total", "result" => result).increment(1);
}

/// Record the fate of one poll answer event
pub fn record_answer(result: &'static str) {
    metrics::counter!("quiz_answers_total", "result" => result).increment(1);
}

/// Record a completed quiz and its score
pub fn record_quiz_completed(correct: usize, total: usize) {
    metrics::counter!("quiz_completed_total").increment(1);
    if total > 0 {
        metrics::histogram!("quiz_score_ratio").record(correct as f64 / total as f64);
    }
}

/// Record a reveal attempt (`private`, `origin_chat`, `denied`, `expired`, `failed`)
pub fn record_reveal(result: &'static str) {
    metrics::counter!("quiz_reveals_total", "result" => result).increment(1);
}

/// Record sessions retired by the idle sweeper
pub fn record_sessions_swept(count: usize) {
    metrics::counter!("quiz_sessions_swept_total").increment(count as u64);
}

/// Publish the current session gauge
pub fn set_active_sessions(sessions: usize, tickets: usize) {
    metrics::gauge!("quiz_active_sessions").set(sessions as f64);
    metrics::gauge!("quiz_outstanding_tickets").set(tickets as f64);
}

/// Record an admin question file upload
pub fn record_csv_upload(success: bool, question_count: usize) {
    let result = if success { "stored" } else { "rejected" };
    metrics::counter!("quiz_csv_uploads_total", "result" => result).increment(1);
    if success {
        metrics::histogram!("quiz_csv_upload_questions").record(question_count as f64);
    }
}
