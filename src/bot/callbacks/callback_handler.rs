//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{debug, Instrument};

use super::{admin_callbacks, navigation_callbacks, reveal_callbacks, CallbackNotice};
use crate::bot::callback_data::{CallbackAction, MenuMode};
use crate::bot::{BotServices, HandlerContext};
use crate::dialogue::QuizDialogue;
use crate::errors::{error_logging, AppError};
use crate::localization::t_lang;
use crate::observability;

/// Handle callback queries from inline keyboards
pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    services: BotServices,
    dialogue: QuizDialogue,
) -> Result<()> {
    let span = observability::telegram_span("callback_handler", Some(q.from.id.0));
    async move {
        let start_time = std::time::Instant::now();
        let language_code = q.from.language_code.as_deref();
        let ctx = HandlerContext {
            bot: &bot,
            localization: &services.localization,
            language_code,
        };

        let data = q.data.as_deref().unwrap_or("");
        debug!(user_id = %q.from.id, data, "Callback received");

        let notice = match route(ctx, &services, &q, &dialogue, data).await {
            Ok(notice) => notice,
            Err(e) => {
                let error = AppError::from(e);
                error_logging::log_app_error(&error, "callback_handler", Some(q.from.id.0));
                observability::record_error_metrics("callback", "bot");
                Some(CallbackNotice::alert(t_lang(
                    &services.localization,
                    error.user_message_key(),
                    language_code,
                )))
            }
        };

        // Answer the callback query to remove the loading state
        let mut answer = bot.answer_callback_query(q.id.clone());
        if let Some(notice) = notice {
            answer = answer.text(notice.text).show_alert(notice.alert);
        }
        answer.await?;

        observability::metrics::record_request_metrics(
            "telegram_callback",
            200,
            start_time.elapsed(),
        );
        Ok(())
    }
    .instrument(span)
    .await
}

async fn route(
    ctx: HandlerContext<'_>,
    services: &BotServices,
    q: &CallbackQuery,
    dialogue: &QuizDialogue,
    data: &str,
) -> Result<Option<CallbackNotice>> {
    let Some(action) = CallbackAction::parse(data) else {
        debug!(data, "Ignoring unknown callback data");
        return Ok(None);
    };

    let admin_only = matches!(
        action,
        CallbackAction::Navigate {
            mode: MenuMode::Admin,
            ..
        } | CallbackAction::AddEntry { .. }
    );
    if admin_only && !services.is_admin(q.from.id.0) {
        return Ok(Some(CallbackNotice::alert(t_lang(
            ctx.localization,
            "admins-only",
            ctx.language_code,
        ))));
    }

    match action {
        CallbackAction::Navigate { mode, path } => {
            navigation_callbacks::handle_navigation(ctx, services, q, dialogue, mode, &path).await
        }
        CallbackAction::AddEntry { path } => {
            admin_callbacks::handle_add_entry(ctx, services, q, dialogue, &path).await
        }
        CallbackAction::Reveal {
            session_id,
            owner_id,
        } => reveal_callbacks::handle_reveal(ctx, services, q, session_id, owner_id).await,
    }
}
