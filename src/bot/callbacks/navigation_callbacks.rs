//! Catalog menus for `/aiquiz` and `/addaicsv`, and the quiz launch.

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, ParseMode};
use tracing::{debug, info};

use super::admin_callbacks;
use super::CallbackNotice;
use crate::bot::callback_data::{resolve_path, MenuMode};
use crate::bot::ui_builder::{level_keyboard, level_prompt};
use crate::bot::{BotServices, HandlerContext};
use crate::dialogue::QuizDialogue;
use crate::localization::t_lang;
use crate::question_bank::{TestRef, CATALOG_DEPTH};
use crate::quiz::{QuizError, QuizRequest, QuizResult};

/// Text and keyboard for the level below `path`; `None` when the path is stale
pub fn render_menu(
    services: &BotServices,
    path: &[usize],
    mode: MenuMode,
    language_code: Option<&str>,
) -> QuizResult<Option<(String, InlineKeyboardMarkup)>> {
    let Some(names) = resolve_path(&services.bank, path)? else {
        return Ok(None);
    };
    if names.len() >= CATALOG_DEPTH {
        return Ok(None);
    }

    let entries = services.bank.list_level(&names)?;
    let text = level_prompt(
        &names,
        mode,
        entries.is_empty(),
        &services.localization,
        language_code,
    );
    let keyboard = level_keyboard(&entries, path, mode, &services.localization, language_code);
    Ok(Some((text, keyboard)))
}

/// Handle a menu button: descend, go back, or pick a test
pub async fn handle_navigation(
    ctx: HandlerContext<'_>,
    services: &BotServices,
    q: &CallbackQuery,
    dialogue: &QuizDialogue,
    mode: MenuMode,
    path: &[usize],
) -> Result<Option<CallbackNotice>> {
    let expired = || {
        Some(CallbackNotice::alert(t_lang(
            ctx.localization,
            "nav-expired",
            ctx.language_code,
        )))
    };

    let Some(names) = resolve_path(&services.bank, path)? else {
        debug!(?path, "Stale menu path");
        return Ok(expired());
    };

    if let Some(test) = TestRef::from_segments(&names) {
        return match mode {
            MenuMode::User => launch_test(ctx, services, q, test).await,
            MenuMode::Admin => {
                admin_callbacks::request_replacement(ctx, q, dialogue, names).await?;
                Ok(None)
            }
        };
    }

    let Some((text, keyboard)) = render_menu(services, path, mode, ctx.language_code)? else {
        return Ok(expired());
    };

    match &q.message {
        Some(message) => {
            if let Err(e) = ctx
                .bot
                .edit_message_text(message.chat().id, message.id(), text)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard)
                .await
            {
                // Double taps produce "message is not modified"
                debug!(error = %e, "Menu edit skipped");
            }
        }
        None => {
            ctx.bot
                .send_message(q.from.id, text)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard)
                .await?;
        }
    }
    Ok(None)
}

/// Start the chosen test for the caller in the chat the menu lives in
async fn launch_test(
    ctx: HandlerContext<'_>,
    services: &BotServices,
    q: &CallbackQuery,
    test: TestRef,
) -> Result<Option<CallbackNotice>> {
    let chat_id = q
        .message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or_else(|| ChatId::from(q.from.id));

    let request = QuizRequest {
        test,
        owner_id: q.from.id.0,
        chat_id: chat_id.0,
        language_code: q.from.language_code.clone(),
    };

    match services.engine.launch(&request) {
        Ok(session_id) => {
            info!(
                session_id,
                user_id = q.from.id.0,
                chat_id = %chat_id,
                "Quiz launched from menu"
            );
            Ok(None)
        }
        Err(QuizError::NotFound(_)) => Ok(Some(CallbackNotice::alert(t_lang(
            ctx.localization,
            "quiz-test-missing",
            ctx.language_code,
        )))),
        Err(QuizError::InvalidInput(_)) | Err(QuizError::Format(_)) => {
            Ok(Some(CallbackNotice::alert(t_lang(
                ctx.localization,
                "quiz-no-questions",
                ctx.language_code,
            ))))
        }
        Err(e) => Err(e.into()),
    }
}
