//! Command Handlers module for processing bot commands

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{debug, info};

use super::callback_data::MenuMode;
use super::callbacks::navigation_callbacks::render_menu;
use super::{BotServices, HandlerContext};
use crate::dialogue::QuizDialogue;
use crate::localization::t_lang;

/// Commands understood by the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Quiz,
    AddCsv,
    Cancel,
}

impl BotCommand {
    /// Parse `/command` or `/command@BotName`, ignoring any arguments
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?.strip_prefix('/')?;
        let name = word.split('@').next().unwrap_or(word);
        match name.to_ascii_lowercase().as_str() {
            "start" => Some(BotCommand::Start),
            "help" => Some(BotCommand::Help),
            "aiquiz" => Some(BotCommand::Quiz),
            "addaicsv" => Some(BotCommand::AddCsv),
            "cancel" => Some(BotCommand::Cancel),
            _ => None,
        }
    }
}

/// Handle the /start command
pub async fn handle_start_command(ctx: HandlerContext<'_>, chat_id: ChatId) -> Result<()> {
    ctx.bot
        .send_message(
            chat_id,
            t_lang(ctx.localization, "start-message", ctx.language_code),
        )
        .await?;
    Ok(())
}

/// Handle the /help command
pub async fn handle_help_command(ctx: HandlerContext<'_>, chat_id: ChatId) -> Result<()> {
    let help_message = [
        t_lang(ctx.localization, "start-message", ctx.language_code),
        t_lang(ctx.localization, "help-csv-format", ctx.language_code),
    ]
    .join("\n\n");
    ctx.bot.send_message(chat_id, help_message).await?;
    Ok(())
}

/// Handle /aiquiz and /addaicsv: show the root of the catalog menu
pub async fn handle_menu_command(
    ctx: HandlerContext<'_>,
    services: &BotServices,
    chat_id: ChatId,
    mode: MenuMode,
) -> Result<()> {
    let Some((text, keyboard)) = render_menu(services, &[], mode, ctx.language_code)? else {
        return Ok(());
    };

    ctx.bot
        .send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

/// Dispatch one parsed command
pub async fn handle_command(
    ctx: HandlerContext<'_>,
    services: &BotServices,
    msg: &Message,
    dialogue: &QuizDialogue,
    command: BotCommand,
) -> Result<()> {
    let user_id = msg.from.as_ref().map(|u| u.id.0);
    debug!(chat_id = %msg.chat.id, ?user_id, ?command, "Handling command");

    match command {
        BotCommand::Start => handle_start_command(ctx, msg.chat.id).await,
        BotCommand::Help => handle_help_command(ctx, msg.chat.id).await,
        BotCommand::Quiz => handle_menu_command(ctx, services, msg.chat.id, MenuMode::User).await,
        BotCommand::AddCsv => {
            if !user_id.is_some_and(|id| services.is_admin(id)) {
                info!(chat_id = %msg.chat.id, ?user_id, "Non-admin tried /addaicsv");
                let text = t_lang(ctx.localization, "admins-only", ctx.language_code);
                ctx.bot.send_message(msg.chat.id, text).await?;
                return Ok(());
            }
            dialogue.exit().await?;
            handle_menu_command(ctx, services, msg.chat.id, MenuMode::Admin).await
        }
        BotCommand::Cancel => {
            dialogue.exit().await?;
            ctx.bot
                .send_message(msg.chat.id, t_lang(ctx.localization, "cancelled", ctx.language_code))
                .await?;
            Ok(())
        }
    }
}
