//! # Application Error Types
//!
//! This module defines common error types used throughout the quiz bot.
//! The quiz engine has its own narrower taxonomy in [`crate::quiz::QuizError`].
//! Handlers propagate `anyhow::Error`; the message and callback handlers
//! classify a failure into an [`AppError`] to pick its log event and the
//! reply shown to the user.

use std::fmt;

/// General application error type for consistent error handling
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Configuration validation errors
    Config(String),
    /// Validation errors (catalog names, uploads, etc.)
    Validation(String),
    /// Quiz engine errors
    Quiz(String),
    /// File system errors
    FileSystem(String),
    /// Network/communication errors
    Network(String),
    /// Caller is not allowed to perform the action
    Unauthorized(String),
    /// Internal application errors
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "[CONFIG] {}", msg),
            AppError::Validation(msg) => write!(f, "[VALIDATION] {}", msg),
            AppError::Quiz(msg) => write!(f, "[QUIZ] {}", msg),
            AppError::FileSystem(msg) => write!(f, "[FILESYSTEM] {}", msg),
            AppError::Network(msg) => write!(f, "[NETWORK] {}", msg),
            AppError::Unauthorized(msg) => write!(f, "[UNAUTHORIZED] {}", msg),
            AppError::Internal(msg) => write!(f, "[INTERNAL] {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Localization key of the message shown to the user for this error
    pub fn user_message_key(&self) -> &'static str {
        match self {
            AppError::Network(_) => "error-network",
            AppError::Unauthorized(_) => "admins-only",
            _ => "error-generic",
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<crate::quiz::QuizError>() {
            Ok(quiz) => return quiz.into(),
            Err(err) => err,
        };
        let err = match err.downcast::<teloxide::RequestError>() {
            Ok(request) => return request.into(),
            Err(err) => err,
        };
        let err = match err.downcast::<reqwest::Error>() {
            Ok(http) => return http.into(),
            Err(err) => err,
        };
        match err.downcast::<std::io::Error>() {
            Ok(io) => io.into(),
            Err(err) => AppError::Internal(format!("{:#}", err)),
        }
    }
}

impl From<teloxide::RequestError> for AppError {
    fn from(err: teloxide::RequestError) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileSystem(err.to_string())
    }
}

impl From<crate::quiz::QuizError> for AppError {
    fn from(err: crate::quiz::QuizError) -> Self {
        use crate::quiz::QuizError;
        match err {
            QuizError::Authorization { .. } => AppError::Unauthorized(err.to_string()),
            QuizError::Format(_) | QuizError::InvalidInput(_) => {
                AppError::Validation(err.to_string())
            }
            QuizError::Delivery(_) => AppError::Network(err.to_string()),
            QuizError::Storage(_) => AppError::FileSystem(err.to_string()),
            other => AppError::Quiz(other.to_string()),
        }
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Standardized error logging utilities for consistent error reporting across the application
pub mod error_logging {
    use super::AppError;
    use tracing::error;

    /// Log a classified handler failure through the matching helper
    pub fn log_app_error(error: &AppError, operation: &str, user_id: Option<u64>) {
        match error {
            AppError::Config(_) => log_config_error(error, "runtime", operation),
            AppError::Validation(_) => {
                log_validation_error(error, operation, user_id, "handler_input", None)
            }
            AppError::Quiz(_) | AppError::Unauthorized(_) => {
                log_quiz_error(error, operation, None, user_id)
            }
            AppError::FileSystem(_) => log_filesystem_error(error, operation, None, None),
            AppError::Network(_) => log_network_error(error, operation, Some("telegram"), None),
            AppError::Internal(_) => {
                log_internal_error(error, "bot", operation, user_id.map(|id| id as i64))
            }
        }
    }

    /// Log quiz engine errors with session context
    pub fn log_quiz_error(
        error: &impl std::fmt::Display,
        operation: &str,
        session_id: Option<u64>,
        user_id: Option<u64>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            session_id = ?session_id,
            user_id = ?user_id,
            "Quiz operation failed"
        );
    }

    /// Log network/communication errors with connection context
    pub fn log_network_error(
        error: &impl std::fmt::Display,
        operation: &str,
        endpoint: Option<&str>,
        attempt_count: Option<u32>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            endpoint = ?endpoint,
            attempt_count = ?attempt_count,
            "Network operation failed"
        );
    }

    /// Log file system errors with path and operation context
    pub fn log_filesystem_error(
        error: &impl std::fmt::Display,
        operation: &str,
        path: Option<&str>,
        file_size: Option<u64>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            path = ?path,
            file_size_bytes = ?file_size,
            "File system operation failed"
        );
    }

    /// Log validation errors with input context
    pub fn log_validation_error(
        error: &impl std::fmt::Display,
        operation: &str,
        user_id: Option<u64>,
        input_type: &str,
        input_value: Option<&str>,
    ) {
        error!(
            error = %error,
            operation = %operation,
            user_id = ?user_id,
            input_type = %input_type,
            input_value = ?input_value.map(|v| if v.chars().count() > 100 {
                format!("{}...", v.chars().take(100).collect::<String>())
            } else {
                v.to_string()
            }),
            "Validation failed"
        );
    }

    /// Log internal application errors with component context
    pub fn log_internal_error(
        error: &impl std::fmt::Display,
        component: &str,
        operation: &str,
        user_id: Option<i64>,
    ) {
        error!(
            error = %error,
            component = %component,
            operation = %operation,
            user_id = ?user_id,
            "Internal application error"
        );
    }

    /// Log configuration errors during startup/initialization
    pub fn log_config_error(error: &impl std::fmt::Display, config_key: &str, operation: &str) {
        error!(
            error = %error,
            config_key = %config_key,
            operation = %operation,
            "Configuration error"
        );
    }
}
