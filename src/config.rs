//! # Unified Application Configuration
//!
//! All settings are read from the environment (after `.env` is loaded by
//! `dotenvy`) into one [`AppConfig`], validated section by section before
//! the bot starts.

use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Bot-specific configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Telegram bot token
    pub token: String,
    /// HTTP client timeout in seconds
    pub http_timeout_secs: u64,
    /// Telegram user ids allowed to manage question files
    pub admin_ids: HashSet<u64>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            http_timeout_secs: 30,
            admin_ids: HashSet::new(),
        }
    }
}

impl BotConfig {
    /// Validate bot configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.token.trim().is_empty() {
            return Err(AppError::Config("Bot token cannot be empty".to_string()));
        }

        let (bot_id, secret) = self.token.split_once(':').ok_or_else(|| {
            AppError::Config(
                "Bot token format is invalid. Expected format: 'bot_id:bot_token'".to_string(),
            )
        })?;

        if bot_id.parse::<u64>().is_err() {
            return Err(AppError::Config("Bot token bot ID must be numeric".to_string()));
        }

        if secret.len() < 20 || secret.contains(':') {
            return Err(AppError::Config(
                "Bot token appears to be malformed. Please verify it's a valid token".to_string(),
            ));
        }

        if self.http_timeout_secs == 0 || self.http_timeout_secs > 300 {
            return Err(AppError::Config(
                "HTTP timeout must be between 1 and 300 seconds".to_string(),
            ));
        }

        Ok(())
    }

    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

/// Quiz engine and question bank settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizConfig {
    /// Root directory of the Subject/SubSubject/Topic/Test.csv tree
    pub quiz_root: PathBuf,
    /// Questions per run; longer tests are truncated
    pub max_questions: usize,
    /// Delay between consecutive poll publishes
    pub poll_pacing_ms: u64,
    /// Maximum poll explanation length in characters
    pub explanation_limit: usize,
    /// Sessions idle for longer than this are retired
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            quiz_root: PathBuf::from("quizzes"),
            max_questions: 20,
            poll_pacing_ms: 1200,
            explanation_limit: 200,
            idle_timeout_secs: 3600,
            sweep_interval_secs: 60,
        }
    }
}

impl QuizConfig {
    /// Validate quiz configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.quiz_root.as_os_str().is_empty() {
            return Err(AppError::Config("QUIZ_ROOT cannot be empty".to_string()));
        }

        if self.max_questions == 0 || self.max_questions > 100 {
            return Err(AppError::Config(
                "Max questions must be between 1 and 100".to_string(),
            ));
        }

        // Telegram caps quiz explanations at 200 characters
        if self.explanation_limit > 200 {
            return Err(AppError::Config(
                "Explanation limit cannot exceed 200 characters".to_string(),
            ));
        }

        if self.poll_pacing_ms > 60_000 {
            return Err(AppError::Config(
                "Poll pacing cannot be greater than 60 seconds".to_string(),
            ));
        }

        if self.sweep_interval_secs == 0 {
            return Err(AppError::Config("Sweep interval cannot be 0".to_string()));
        }

        if self.idle_timeout_secs < self.sweep_interval_secs {
            return Err(AppError::Config(
                "Idle timeout cannot be shorter than the sweep interval".to_string(),
            ));
        }

        Ok(())
    }

    pub fn poll_pacing(&self) -> Duration {
        Duration::from_millis(self.poll_pacing_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Server configuration for health checks and metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Metrics and health server port
    pub metrics_port: u16,
    /// Whether to allow privileged ports (< 1024)
    pub allow_privileged_ports: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            metrics_port: 9090,
            allow_privileged_ports: false,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.metrics_port == 0 {
            return Err(AppError::Config("Metrics port cannot be 0".to_string()));
        }

        if !self.allow_privileged_ports && self.metrics_port < 1024 {
            return Err(AppError::Config(format!(
                "Metrics port {} is privileged. Set ALLOW_PRIVILEGED_PORTS=true or use port >= 1024",
                self.metrics_port
            )));
        }

        Ok(())
    }
}

/// Unified application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub quiz: QuizConfig,
    pub server: ServerConfig,
    pub observability: ObservabilityConfig,
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> AppResult<T> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be a valid number", key))),
        _ => Ok(default),
    }
}

/// Parse a comma separated list of Telegram user ids
pub fn parse_admin_ids(raw: &str) -> AppResult<HashSet<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .map_err(|_| AppError::Config(format!("ADMIN_IDS contains an invalid id: {}", s)))
        })
        .collect()
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup (the environment in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let bot_defaults = BotConfig::default();
        let quiz_defaults = QuizConfig::default();
        let server_defaults = ServerConfig::default();

        let bot = BotConfig {
            token: lookup("TELEGRAM_BOT_TOKEN").ok_or_else(|| {
                AppError::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
            })?,
            http_timeout_secs: parse_var(
                &lookup,
                "HTTP_CLIENT_TIMEOUT_SECS",
                bot_defaults.http_timeout_secs,
            )?,
            admin_ids: parse_admin_ids(&lookup("ADMIN_IDS").unwrap_or_default())?,
        };

        let quiz = QuizConfig {
            quiz_root: lookup("QUIZ_ROOT")
                .filter(|r| !r.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(quiz_defaults.quiz_root),
            max_questions: parse_var(&lookup, "QUIZ_MAX_QUESTIONS", quiz_defaults.max_questions)?,
            poll_pacing_ms: parse_var(
                &lookup,
                "QUIZ_POLL_PACING_MS",
                quiz_defaults.poll_pacing_ms,
            )?,
            explanation_limit: parse_var(
                &lookup,
                "QUIZ_EXPLANATION_LIMIT",
                quiz_defaults.explanation_limit,
            )?,
            idle_timeout_secs: parse_var(
                &lookup,
                "QUIZ_IDLE_TIMEOUT_SECS",
                quiz_defaults.idle_timeout_secs,
            )?,
            sweep_interval_secs: parse_var(
                &lookup,
                "QUIZ_SWEEP_INTERVAL_SECS",
                quiz_defaults.sweep_interval_secs,
            )?,
        };

        let server = ServerConfig {
            metrics_port: parse_var(&lookup, "METRICS_PORT", server_defaults.metrics_port)?,
            allow_privileged_ports: lookup("ALLOW_PRIVILEGED_PORTS")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
        };

        let mut observability = ObservabilityConfig::from_env();
        observability.metrics_port = server.metrics_port;

        Ok(Self {
            bot,
            quiz,
            server,
            observability,
        })
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.bot.validate()?;
        self.quiz.validate()?;
        self.server.validate()?;
        self.observability.validate().map_err(AppError::Config)?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: bot_token=[REDACTED], admins={}, quiz_root={}, max_questions={}, \
             poll_pacing_ms={}, idle_timeout_secs={}, metrics_port={}, environment={}",
            self.bot.admin_ids.len(),
            self.quiz.quiz_root.display(),
            self.quiz.max_questions,
            self.quiz.poll_pacing_ms,
            self.quiz.idle_timeout_secs,
            self.server.metrics_port,
            self.observability.environment
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const TOKEN: &str = "123456789:AAFakeTokenForTestingPurposes1234567890";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", TOKEN)])).unwrap();
        assert_eq!(config.quiz.max_questions, 20);
        assert_eq!(config.quiz.poll_pacing_ms, 1200);
        assert_eq!(config.quiz.explanation_limit, 200);
        assert_eq!(config.quiz.quiz_root, PathBuf::from("quizzes"));
        assert!(config.bot.admin_ids.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", TOKEN),
            ("ADMIN_IDS", "42, 7,"),
            ("QUIZ_ROOT", "/srv/quizzes"),
            ("QUIZ_MAX_QUESTIONS", "10"),
            ("QUIZ_POLL_PACING_MS", "0"),
            ("METRICS_PORT", "9100"),
        ]))
        .unwrap();

        assert!(config.bot.is_admin(42));
        assert!(config.bot.is_admin(7));
        assert!(!config.bot.is_admin(1));
        assert_eq!(config.quiz.quiz_root, PathBuf::from("/srv/quizzes"));
        assert_eq!(config.quiz.max_questions, 10);
        assert_eq!(config.quiz.poll_pacing(), Duration::ZERO);
        assert_eq!(config.observability.metrics_port, 9100);
    }

    #[test]
    fn test_summary_redacts_token() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", TOKEN),
            ("QUIZ_POLL_PACING_MS", "250"),
        ]))
        .unwrap();

        let summary = config.summary();
        assert!(!summary.contains(TOKEN));
        assert!(summary.contains("max_questions=20, poll_pacing_ms=250, "));
        assert!(!summary.contains("  "));
    }

    #[test]
    fn test_from_lookup_errors() {
        assert!(AppConfig::from_lookup(lookup(&[])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", TOKEN),
            ("QUIZ_MAX_QUESTIONS", "many"),
        ]))
        .is_err());
        assert!(AppConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", TOKEN),
            ("ADMIN_IDS", "42,bob"),
        ]))
        .is_err());
    }

    #[test]
    fn test_bot_config_validation() {
        let mut config = BotConfig::default();
        assert!(config.validate().is_err());

        config.token = "invalid-token".to_string();
        assert!(config.validate().is_err());

        config.token = "123:short".to_string();
        assert!(config.validate().is_err());

        config.token = TOKEN.to_string();
        assert!(config.validate().is_ok());

        config.http_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_quiz_config_validation() {
        let mut config = QuizConfig::default();
        assert!(config.validate().is_ok());

        config.max_questions = 0;
        assert!(config.validate().is_err());
        config.max_questions = 20;

        config.explanation_limit = 500;
        assert!(config.validate().is_err());
        config.explanation_limit = 200;

        config.idle_timeout_secs = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_server_config_validation() {
        let mut config = ServerConfig::default();
        assert!(config.validate().is_ok());

        config.metrics_port = 80;
        assert!(config.validate().is_err());

        config.allow_privileged_ports = true;
        assert!(config.validate().is_ok());
    }
}
