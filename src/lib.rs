//! # Poll Quiz Telegram Bot
//!
//! A Telegram bot that serves multiple-choice tests, stored as CSV files in
//! a Subject → Sub-Subject → Topic → Test hierarchy, as native quiz polls,
//! then scores each run and reveals the answers to the user who took it.

pub mod bot;
pub mod config;
pub mod dialogue;
pub mod errors;
pub mod localization;
pub mod observability;
pub mod observability_config;
pub mod path_validation;
pub mod question_bank;
pub mod quiz;

// Re-export types for easier access
pub use question_bank::{FsQuestionBank, QuestionBank, QuestionRecord, TestRef};
pub use quiz::{QuizEngine, QuizError, QuizResult, QuizSessionStore};
