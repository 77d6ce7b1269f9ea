//! Admin catalog editing: "Add new …" buttons and upload requests.

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::html;
use tracing::info;

use super::CallbackNotice;
use crate::bot::callback_data::resolve_path;
use crate::bot::ui_builder::{ask_name_key, path_label};
use crate::bot::{BotServices, HandlerContext};
use crate::dialogue::{QuizDialogue, QuizDialogueState};
use crate::localization::{t_args_lang, t_lang};
use crate::question_bank::CatalogLevel;

fn reply_chat(q: &CallbackQuery) -> ChatId {
    q.message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or_else(|| ChatId::from(q.from.id))
}

/// An existing test was picked: the next CSV upload replaces it
pub async fn request_replacement(
    ctx: HandlerContext<'_>,
    q: &CallbackQuery,
    dialogue: &QuizDialogue,
    path: Vec<String>,
) -> Result<()> {
    let label = path_label(&path);
    info!(user_id = q.from.id.0, test = %label, "Admin asked to replace test");

    dialogue
        .update(QuizDialogueState::AwaitingUpload {
            path,
            replacing: true,
            language_code: ctx.language_code.map(str::to_string),
        })
        .await?;

    ctx.bot
        .send_message(
            reply_chat(q),
            t_args_lang(
                ctx.localization,
                "admin-upload-replace",
                &[("test", &html::escape(&label))],
                ctx.language_code,
            ),
        )
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// "Add new …" below `path`: ask for a name, or for a CSV at test level
pub async fn handle_add_entry(
    ctx: HandlerContext<'_>,
    services: &BotServices,
    q: &CallbackQuery,
    dialogue: &QuizDialogue,
    path: &[usize],
) -> Result<Option<CallbackNotice>> {
    let Some(names) = resolve_path(&services.bank, path)? else {
        return Ok(Some(CallbackNotice::alert(t_lang(
            ctx.localization,
            "nav-expired",
            ctx.language_code,
        ))));
    };
    let language_code = ctx.language_code.map(str::to_string);

    let Some(level) = CatalogLevel::from_depth(names.len()) else {
        return Ok(None);
    };

    let text = match ask_name_key(level) {
        Some(key) => {
            dialogue
                .update(QuizDialogueState::AwaitingName {
                    parent: names,
                    language_code,
                })
                .await?;
            t_lang(ctx.localization, key, ctx.language_code)
        }
        None => {
            // Test level: the upload becomes the next free Test_N
            let next = services
                .bank
                .next_test_name(&names[0], &names[1], &names[2])?;
            let mut target = names;
            target.push(next);
            let label = path_label(&target);

            dialogue
                .update(QuizDialogueState::AwaitingUpload {
                    path: target,
                    replacing: false,
                    language_code,
                })
                .await?;
            t_args_lang(
                ctx.localization,
                "admin-upload-new",
                &[("test", &html::escape(&label))],
                ctx.language_code,
            )
        }
    };

    ctx.bot
        .send_message(reply_chat(q), text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(None)
}
