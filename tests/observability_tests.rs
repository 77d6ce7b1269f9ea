//! # Observability Tests Module
//!
//! Metrics recording, span creation and readiness reporting for the quiz bot.

#[cfg(test)]
mod tests {
    use poll_quiz_bot::observability::{self, health_checks, metrics, ReadinessContext};
    use poll_quiz_bot::observability_config::ObservabilityConfig;
    use poll_quiz_bot::quiz::QuizSessionStore;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    /// Recording without an installed recorder must be a silent no-op
    #[test]
    fn test_metrics_recording_without_recorder() {
        observability::record_telegram_message("poll");
        observability::record_telegram_message("text");
        observability::record_error_metrics("delivery", "quiz");

        metrics::record_session_started(12);
        metrics::record_poll_dispatch(true);
        metrics::record_poll_dispatch(false);
        metrics::record_answer("counted");
        metrics::record_answer("ignored");
        metrics::record_quiz_completed(4, 5);
        metrics::record_quiz_completed(0, 0);
        metrics::record_reveal("private");
        metrics::record_sessions_swept(3);
        metrics::set_active_sessions(2, 7);
        metrics::record_csv_upload(true, 30);
        metrics::record_csv_upload(false, 0);
        metrics::record_request_metrics("callback", 200, Duration::from_millis(25));
        metrics::record_health_check_metrics("quiz_root", true, Duration::from_micros(40));
        metrics::record_startup_metrics(Duration::from_millis(120));
    }

    #[test]
    fn test_span_creation() {
        let quiz = observability::quiz_span("dispatch", Some(9));
        let telegram = observability::telegram_span("poll_answer", Some(12345));
        let catalog = observability::catalog_span("store_upload", "Biology/Cells");

        quiz.in_scope(|| tracing::info!("inside quiz span"));
        telegram.in_scope(|| tracing::debug!("inside telegram span"));
        catalog.in_scope(|| tracing::warn!("inside catalog span"));
    }

    #[test]
    fn test_rate_limiter_window() {
        let limiter = metrics::RateLimiter::new(2, 60);

        assert!(limiter.is_allowed("10.0.0.1"));
        assert!(limiter.is_allowed("10.0.0.1"));
        assert!(!limiter.is_allowed("10.0.0.1"));
        // Limits are per client
        assert!(limiter.is_allowed("10.0.0.2"));
    }

    #[test]
    fn test_observability_configuration() {
        let config = ObservabilityConfig::default();
        assert!(config.validate().is_ok());

        let invalid = ObservabilityConfig {
            trace_sampling_ratio: 1.5,
            ..ObservabilityConfig::default()
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_readiness_reports_session_counts() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(QuizSessionStore::default());
        let ctx = ReadinessContext {
            bot_token: "42:token".to_string(),
            quiz_root: dir.path().to_path_buf(),
            store: Arc::clone(&store),
        };

        let report = health_checks::perform_readiness_checks(&ctx);
        assert!(report.ready);
        assert_eq!(report.checks.len(), 2);
        assert_eq!(report.sessions.active, 0);

        let bad_token = ReadinessContext {
            bot_token: String::new(),
            ..ctx
        };
        let report = health_checks::perform_readiness_checks(&bad_token);
        assert!(!report.ready);
        assert!(report.checks[0].detail.is_some());
    }

    #[tokio::test]
    async fn test_health_recorder_stops_on_cancel() {
        let dir = tempfile::TempDir::new().unwrap();
        let ctx = ReadinessContext {
            bot_token: "42:token".to_string(),
            quiz_root: dir.path().to_path_buf(),
            store: Arc::new(QuizSessionStore::default()),
        };
        let shutdown = CancellationToken::new();

        let handle = health_checks::start_health_metrics_recorder(
            ctx,
            Duration::from_millis(10),
            shutdown.clone(),
        );
        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.cancel();

        let joined = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }
}
