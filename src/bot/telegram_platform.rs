//! [`QuizPlatform`] over the Telegram Bot API.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputPollOption, MessageId, ParseMode, PollType};
use teloxide::{ApiError, RequestError};
use tracing::debug;

use super::ui_builder::reveal_keyboard;
use crate::observability;
use crate::quiz::{
    MessageRef, PollRequest, PrivateDelivery, QuizError, QuizPlatform, QuizResult, RevealControl,
};

pub struct TelegramPlatform {
    bot: Bot,
}

impl TelegramPlatform {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn delivery_error(operation: &str, err: RequestError) -> QuizError {
    QuizError::Delivery(format!("{}: {}", operation, err))
}

/// Errors meaning the user never started the bot privately or blocked it
fn is_private_chat_unreachable(err: &RequestError) -> bool {
    matches!(
        err,
        RequestError::Api(
            ApiError::BotBlocked
                | ApiError::CantInitiateConversation
                | ApiError::ChatNotFound
                | ApiError::UserDeactivated
        )
    )
}

#[async_trait]
impl QuizPlatform for TelegramPlatform {
    async fn publish_poll(&self, chat_id: i64, poll: &PollRequest) -> QuizResult<String> {
        let correct = u8::try_from(poll.correct_index)
            .map_err(|_| QuizError::InvalidInput(format!("option {}", poll.correct_index)))?;

        let mut request = self
            .bot
            .send_poll(
                ChatId(chat_id),
                poll.prompt.clone(),
                poll.options.iter().cloned().map(InputPollOption::new),
            )
            .type_(PollType::Quiz)
            .is_anonymous(false)
            .allows_multiple_answers(false)
            .correct_option_id(correct);
        if let Some(explanation) = &poll.explanation {
            request = request.explanation(explanation.clone());
        }

        let message = request.await.map_err(|e| delivery_error("send_poll", e))?;
        observability::record_telegram_message("poll");

        let poll_ref = message
            .poll()
            .map(|p| p.id.to_string())
            .ok_or_else(|| QuizError::Delivery("sent message carries no poll".to_string()))?;
        debug!(chat_id, poll_ref = %poll_ref, "Quiz poll published");
        Ok(poll_ref)
    }

    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        control: Option<&RevealControl>,
    ) -> QuizResult<MessageRef> {
        let mut request = self
            .bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html);
        if let Some(control) = control {
            request = request.reply_markup(reveal_keyboard(control));
        }

        let message = request
            .await
            .map_err(|e| delivery_error("send_message", e))?;
        observability::record_telegram_message("text");

        Ok(MessageRef {
            chat_id,
            message_id: message.id.0,
        })
    }

    async fn edit_message(
        &self,
        message: &MessageRef,
        text: &str,
        control: Option<&RevealControl>,
    ) -> QuizResult<()> {
        let mut request = self
            .bot
            .edit_message_text(ChatId(message.chat_id), MessageId(message.message_id), text)
            .parse_mode(ParseMode::Html);
        if let Some(control) = control {
            request = request.reply_markup(reveal_keyboard(control));
        }

        request
            .await
            .map_err(|e| delivery_error("edit_message_text", e))?;
        observability::record_telegram_message("edit");
        Ok(())
    }

    async fn send_private(&self, user_id: u64, text: &str) -> QuizResult<PrivateDelivery> {
        match self
            .bot
            .send_message(UserId(user_id), text)
            .parse_mode(ParseMode::Html)
            .await
        {
            Ok(_) => {
                observability::record_telegram_message("private");
                Ok(PrivateDelivery::Delivered)
            }
            Err(e) if is_private_chat_unreachable(&e) => {
                debug!(user_id, error = %e, "Private chat unreachable");
                Ok(PrivateDelivery::Unreachable)
            }
            Err(e) => Err(delivery_error("send_private", e)),
        }
    }
}
