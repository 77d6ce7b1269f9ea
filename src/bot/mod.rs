//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `callbacks`: inline keyboard routing (navigation, admin menu, reveal)
//! - `command_handlers`: `/start`, `/help`, `/aiquiz`, `/addaicsv`, `/cancel`
//! - `message_handler`: text commands, admin name input and CSV uploads
//! - `poll_answer_handler`: feeds poll answers into the quiz engine
//! - `telegram_platform`: the quiz engine's platform over `teloxide::Bot`
//! - `ui_builder`: keyboards and menu texts

pub mod callback_data;
pub mod callbacks;
pub mod command_handlers;
pub mod message_handler;
pub mod poll_answer_handler;
pub mod telegram_platform;
pub mod ui_builder;

use std::collections::HashSet;
use std::sync::Arc;

use teloxide::Bot;

use crate::localization::LocalizationManager;
use crate::question_bank::FsQuestionBank;
use crate::quiz::QuizEngine;

/// Common context for bot handlers containing shared dependencies
#[derive(Clone, Copy)]
pub struct HandlerContext<'a> {
    pub bot: &'a Bot,
    pub localization: &'a Arc<LocalizationManager>,
    pub language_code: Option<&'a str>,
}

/// Long-lived services shared by every handler
#[derive(Clone)]
pub struct BotServices {
    pub engine: QuizEngine,
    pub bank: Arc<FsQuestionBank>,
    pub localization: Arc<LocalizationManager>,
    pub admin_ids: Arc<HashSet<u64>>,
    /// Client used to download uploaded files
    pub http: reqwest::Client,
}

impl BotServices {
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

// Re-export main handler functions for use in main.rs
pub use callbacks::callback_handler::callback_handler;
pub use message_handler::message_handler;
pub use poll_answer_handler::poll_answer_handler;
pub use telegram_platform::TelegramPlatform;
