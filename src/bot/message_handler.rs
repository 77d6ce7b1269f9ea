//! Message Handler module for processing incoming Telegram messages

use anyhow::{Context, Result};
use std::io::Write;
use teloxide::prelude::*;
use teloxide::types::{Document, ParseMode};
use teloxide::utils::html;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn, Instrument};

use super::callback_data::{locate_path, MenuMode};
use super::callbacks::navigation_callbacks::render_menu;
use super::command_handlers::{handle_command, BotCommand};
use super::ui_builder::path_label;
use super::{BotServices, HandlerContext};
use crate::dialogue::{QuizDialogue, QuizDialogueState};
use crate::errors::{error_logging, AppError};
use crate::localization::{t_args_lang, t_lang};
use crate::observability;
use crate::path_validation::{display_label, sanitize_segment, validate_segment};
use crate::question_bank::{CatalogLevel, TestRef};
use crate::quiz::QuizError;

/// Largest question file accepted from an admin
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Download a Telegram file into a temporary file that is removed on drop
pub async fn download_file(
    bot: &Bot,
    http: &reqwest::Client,
    document: &Document,
) -> Result<NamedTempFile> {
    if u64::from(document.file.size) > MAX_UPLOAD_BYTES {
        anyhow::bail!(
            "File too large: {} bytes (maximum allowed: {} bytes)",
            document.file.size,
            MAX_UPLOAD_BYTES
        );
    }

    let file = bot.get_file(document.file.id.clone()).await?;
    let url = format!(
        "https://api.telegram.org/file/bot{}/{}",
        bot.token(),
        file.path
    );

    let bytes = http
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    let mut temp_file = NamedTempFile::new().context("Failed to create temporary upload file")?;
    temp_file.as_file_mut().write_all(&bytes)?;
    Ok(temp_file)
}

fn is_csv_upload(document: &Document) -> bool {
    document
        .file_name
        .as_deref()
        .and_then(|name| name.rsplit_once('.'))
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("csv"))
}

async fn handle_text_message(
    ctx: HandlerContext<'_>,
    services: &BotServices,
    msg: &Message,
    dialogue: QuizDialogue,
    text: &str,
) -> Result<()> {
    debug!(chat_id = %msg.chat.id, message_length = text.len(), "Received text message");

    if let Some(command) = BotCommand::parse(text) {
        return handle_command(ctx, services, msg, &dialogue, command).await;
    }

    let user_id = msg.from.as_ref().map(|u| u.id.0);
    if !user_id.is_some_and(|id| services.is_admin(id)) {
        return Ok(());
    }

    match dialogue.get().await? {
        Some(state @ QuizDialogueState::AwaitingName { .. }) => {
            match (state.naming_level(), state) {
                (Some(level), QuizDialogueState::AwaitingName { parent, .. }) => {
                    handle_name_input(ctx, services, msg, &dialogue, parent, level, text).await
                }
                _ => {
                    dialogue.exit().await?;
                    send_notice(ctx, msg, "admin-context-lost").await
                }
            }
        }
        Some(QuizDialogueState::AwaitingUpload { .. }) => {
            send_notice(ctx, msg, "admin-not-csv").await
        }
        _ => Ok(()),
    }
}

async fn send_notice(ctx: HandlerContext<'_>, msg: &Message, key: &str) -> Result<()> {
    let text = t_lang(ctx.localization, key, ctx.language_code);
    ctx.bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

/// Create the directory an admin just named and show its (empty) level
async fn handle_name_input(
    ctx: HandlerContext<'_>,
    services: &BotServices,
    msg: &Message,
    dialogue: &QuizDialogue,
    parent: Vec<String>,
    level: CatalogLevel,
    input: &str,
) -> Result<()> {
    let segment = sanitize_segment(input);
    if let Err(reason) = validate_segment(&segment) {
        error_logging::log_validation_error(
            &reason,
            "handle_name_input",
            msg.from.as_ref().map(|u| u.id.0),
            "catalog_name",
            Some(input),
        );
        ctx.bot
            .send_message(
                msg.chat.id,
                t_args_lang(
                    ctx.localization,
                    "admin-invalid-name",
                    &[("reason", &reason.to_string())],
                    ctx.language_code,
                ),
            )
            .await?;
        return Ok(());
    }

    let mut names = parent;
    names.push(segment.clone());
    services.bank.ensure_path(&names)?;
    dialogue.exit().await?;
    info!(path = %path_label(&names), level = ?level, "Admin created catalog entry");

    ctx.bot
        .send_message(
            msg.chat.id,
            t_args_lang(
                ctx.localization,
                "admin-created",
                &[("name", &display_label(&segment))],
                ctx.language_code,
            ),
        )
        .await?;

    let menu = match locate_path(&services.bank, &names)? {
        Some(path) => render_menu(services, &path, MenuMode::Admin, ctx.language_code)?,
        None => None,
    };
    if let Some((text, keyboard)) = menu {
        ctx.bot
            .send_message(msg.chat.id, text)
            .parse_mode(ParseMode::Html)
            .reply_markup(keyboard)
            .await?;
    }
    Ok(())
}

async fn handle_document_message(
    ctx: HandlerContext<'_>,
    services: &BotServices,
    msg: &Message,
    dialogue: QuizDialogue,
    document: &Document,
) -> Result<()> {
    let user_id = msg.from.as_ref().map(|u| u.id.0);
    if !user_id.is_some_and(|id| services.is_admin(id)) {
        return Ok(());
    }

    let state = dialogue.get().await?.unwrap_or_default();
    let replacing = match &state {
        QuizDialogueState::AwaitingUpload { replacing, .. } => *replacing,
        QuizDialogueState::AwaitingName { .. } => {
            return send_notice(ctx, msg, "admin-expect-name").await;
        }
        QuizDialogueState::Start => return Ok(()),
    };
    // Reply in the language the admin started the flow with
    let ctx = HandlerContext {
        language_code: state.language_code().or(ctx.language_code),
        ..ctx
    };

    let Some(test) = state.upload_target() else {
        dialogue.exit().await?;
        return send_notice(ctx, msg, "admin-context-lost").await;
    };

    if !is_csv_upload(document) {
        return send_notice(ctx, msg, "admin-not-csv").await;
    }

    let label = test.label();
    store_upload(ctx, services, msg, &dialogue, document, test, replacing)
        .instrument(observability::catalog_span("store_test", &label))
        .await
}

async fn store_upload(
    ctx: HandlerContext<'_>,
    services: &BotServices,
    msg: &Message,
    dialogue: &QuizDialogue,
    document: &Document,
    test: TestRef,
    replacing: bool,
) -> Result<()> {
    let temp_file = match download_file(ctx.bot, &services.http, document).await {
        Ok(file) => file,
        Err(e) => {
            error_logging::log_network_error(&e, "download_file", Some("telegram_file"), None);
            return send_notice(ctx, msg, "admin-upload-failed").await;
        }
    };

    let reply = match services.bank.store_test(&test, temp_file.path()) {
        Ok(stored) => {
            observability::metrics::record_csv_upload(true, stored.question_count);
            dialogue.exit().await?;
            info!(test = %stored.test.label(), replacing, "Stored question file");

            let mut reply = t_args_lang(
                ctx.localization,
                if replacing {
                    "admin-csv-replaced"
                } else {
                    "admin-csv-saved"
                },
                &[
                    ("path", &html::escape(&stored.test.label())),
                    ("count", &stored.question_count.to_string()),
                ],
                ctx.language_code,
            );
            if stored.skipped_rows > 0 {
                reply.push('\n');
                reply.push_str(&t_args_lang(
                    ctx.localization,
                    "admin-csv-skipped",
                    &[("count", &stored.skipped_rows.to_string())],
                    ctx.language_code,
                ));
            }
            reply
        }
        // The admin stays in the upload state and can send a fixed file
        Err(QuizError::InvalidInput(reason)) | Err(QuizError::Format(reason)) => {
            observability::metrics::record_csv_upload(false, 0);
            warn!(test = %test.label(), reason = %reason, "Rejected question upload");
            t_args_lang(
                ctx.localization,
                "admin-csv-invalid",
                &[("reason", &html::escape(&reason))],
                ctx.language_code,
            )
        }
        Err(e) => {
            observability::metrics::record_csv_upload(false, 0);
            return Err(e.into());
        }
    };

    ctx.bot
        .send_message(msg.chat.id, reply)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    services: BotServices,
    dialogue: QuizDialogue,
) -> Result<()> {
    let user_id = msg.from.as_ref().map(|u| u.id.0);
    let span = observability::telegram_span("message_handler", user_id);
    async move {
        let start_time = std::time::Instant::now();
        let language_code = msg
            .from
            .as_ref()
            .and_then(|user| user.language_code.as_deref());
        let ctx = HandlerContext {
            bot: &bot,
            localization: &services.localization,
            language_code,
        };

        let message_type = if msg.text().is_some() {
            "text"
        } else if msg.document().is_some() {
            "document"
        } else {
            "unsupported"
        };
        observability::record_telegram_message(message_type);

        let result = if let Some(text) = msg.text() {
            handle_text_message(ctx, &services, &msg, dialogue, text).await
        } else if let Some(document) = msg.document() {
            handle_document_message(ctx, &services, &msg, dialogue, document).await
        } else {
            Ok(())
        };

        if let Err(e) = result {
            let error = AppError::from(e);
            error_logging::log_app_error(&error, "message_handler", user_id);
            observability::record_error_metrics("message", "bot");
            let key = error.user_message_key();
            let text = t_lang(&services.localization, key, language_code);
            bot.send_message(msg.chat.id, text).await?;
        }

        observability::metrics::record_request_metrics(
            "telegram_message",
            200,
            start_time.elapsed(),
        );
        Ok(())
    }
    .instrument(span)
    .await
}

