//! The chat platform seam the quiz engine publishes through.

use async_trait::async_trait;

use super::error::QuizResult;
use super::session::{MessageRef, SessionId};

/// One quiz poll ready to publish
#[derive(Debug, Clone, PartialEq)]
pub struct PollRequest {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub explanation: Option<String>,
}

/// The single "show answers" control attached to a score message
#[derive(Debug, Clone, PartialEq)]
pub struct RevealControl {
    pub session_id: SessionId,
    pub owner_id: u64,
    pub label: String,
}

/// Outcome of a private delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivateDelivery {
    Delivered,
    /// The user never opened a private chat with the bot, or blocked it
    Unreachable,
}

/// Outbound operations of the chat platform.
///
/// Every failure is reported as [`QuizError::Delivery`](super::QuizError::Delivery)
/// except an unreachable private chat, which is a normal outcome of
/// [`send_private`](QuizPlatform::send_private).
#[async_trait]
pub trait QuizPlatform: Send + Sync {
    /// Publish a non-anonymous single-answer quiz poll and return its poll reference
    async fn publish_poll(&self, chat_id: i64, poll: &PollRequest) -> QuizResult<String>;

    /// Send an HTML message to a chat
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        control: Option<&RevealControl>,
    ) -> QuizResult<MessageRef>;

    /// Replace the text and controls of an earlier message
    async fn edit_message(
        &self,
        message: &MessageRef,
        text: &str,
        control: Option<&RevealControl>,
    ) -> QuizResult<()>;

    /// Send an HTML message to a user's private chat
    async fn send_private(&self, user_id: u64, text: &str) -> QuizResult<PrivateDelivery>;
}
