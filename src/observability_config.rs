//! # Observability Configuration
//!
//! Environment-driven settings for logging, tracing export and the
//! metrics/health endpoint.

use std::env;

const SERVICE_NAME: &str = "poll-quiz-bot";

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("pretty") {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

/// Observability configuration for different environments
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Environment name (development, staging, production)
    pub environment: String,
    /// OTLP endpoint for trace export
    pub otlp_endpoint: Option<String>,
    /// Prometheus metrics endpoint port
    pub metrics_port: u16,
    /// Log level for this crate
    pub log_level: String,
    /// Explicit log format; development falls back to pretty output
    pub log_format: Option<LogFormat>,
    pub enable_trace_sampling: bool,
    /// Trace sampling ratio (0.0-1.0)
    pub trace_sampling_ratio: f64,
    /// Resource attributes attached to exported traces
    pub tags: Vec<(String, String)>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            otlp_endpoint: None,
            metrics_port: 9090,
            log_level: "info".to_string(),
            log_format: None,
            enable_trace_sampling: false,
            trace_sampling_ratio: 1.0,
            tags: Vec::new(),
        }
    }
}

impl ObservabilityConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT")
                .ok()
                .filter(|e| !e.trim().is_empty()),
            metrics_port: env::var("METRICS_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(9090),
            log_level: env::var("OBSERVABILITY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: env::var("LOG_FORMAT").ok().map(|f| LogFormat::parse(&f)),
            enable_trace_sampling: env::var("ENABLE_TRACE_SAMPLING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            trace_sampling_ratio: env::var("TRACE_SAMPLING_RATIO")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1.0),
            tags: env::var("OBSERVABILITY_TAGS")
                .map(|t| parse_tags(&t))
                .unwrap_or_default(),
        };
        config.add_default_tags();
        config
    }

    /// Add service and environment tags unless already set
    fn add_default_tags(&mut self) {
        let mut defaults = vec![
            ("service".to_string(), SERVICE_NAME.to_string()),
            ("environment".to_string(), self.environment.clone()),
        ];
        if let Ok(version) = env::var("SERVICE_VERSION") {
            defaults.push(("version".to_string(), version));
        }

        for (key, value) in defaults {
            if !self.tags.iter().any(|(k, _)| *k == key) {
                self.tags.push((key, value));
            }
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Format actually used by the subscriber
    pub fn effective_log_format(&self) -> LogFormat {
        match self.log_format {
            Some(format) => format,
            None if self.is_development() => LogFormat::Pretty,
            None => LogFormat::Json,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if let Some(endpoint) = &self.otlp_endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(format!("Invalid OTLP endpoint format: {}", endpoint));
            }
        }

        if !(0.0..=1.0).contains(&self.trace_sampling_ratio) {
            return Err(format!(
                "Invalid trace sampling ratio: {}",
                self.trace_sampling_ratio
            ));
        }

        if self.metrics_port == 0 {
            return Err(format!("Invalid metrics port: {}", self.metrics_port));
        }

        Ok(())
    }
}

/// Parse tags from `key1=value1,key2=value2`
fn parse_tags(tags_str: &str) -> Vec<(String, String)> {
    tags_str
        .split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.environment, "development");
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.effective_log_format(), LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ObservabilityConfig {
            otlp_endpoint: Some("collector:4317".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.otlp_endpoint = Some("http://collector:4317".to_string());
        config.trace_sampling_ratio = 1.5;
        assert!(config.validate().is_err());

        config.trace_sampling_ratio = 0.25;
        config.metrics_port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_format_selection() {
        let config = ObservabilityConfig {
            environment: "production".to_string(),
            ..Default::default()
        };
        assert_eq!(config.effective_log_format(), LogFormat::Json);

        let config = ObservabilityConfig {
            environment: "production".to_string(),
            log_format: Some(LogFormat::parse("PRETTY")),
            ..Default::default()
        };
        assert_eq!(config.effective_log_format(), LogFormat::Pretty);
    }

    #[test]
    fn test_tag_parsing() {
        let tags = parse_tags("region=ap-south, team = quiz ,broken,=x");
        assert_eq!(
            tags,
            vec![
                ("region".to_string(), "ap-south".to_string()),
                ("team".to_string(), "quiz".to_string()),
            ]
        );
    }

    #[test]
    fn test_default_tags_do_not_override() {
        let mut config = ObservabilityConfig {
            tags: vec![("service".to_string(), "custom".to_string())],
            ..Default::default()
        };
        config.add_default_tags();
        assert_eq!(config.tags[0], ("service".to_string(), "custom".to_string()));
        assert!(config
            .tags
            .iter()
            .any(|(k, v)| k == "environment" && v == "development"));
    }
}
