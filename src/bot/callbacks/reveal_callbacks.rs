//! The "Show Answers" control on a score message.

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{debug, info};

use super::CallbackNotice;
use crate::bot::{BotServices, HandlerContext};
use crate::errors::error_logging;
use crate::localization::t_lang;
use crate::quiz::{QuizError, RevealDelivery, SessionId};

/// Reveal answers to the caller if, and only if, they own the session.
///
/// `tagged_owner` comes from the button and is only logged; the store
/// decides against the owner it recorded at launch.
pub async fn handle_reveal(
    ctx: HandlerContext<'_>,
    services: &BotServices,
    q: &CallbackQuery,
    session_id: SessionId,
    tagged_owner: u64,
) -> Result<Option<CallbackNotice>> {
    let caller_id = q.from.id.0;
    let notice = |key: &str| t_lang(ctx.localization, key, ctx.language_code);

    match services.engine.reveal(session_id, caller_id).await {
        Ok(RevealDelivery::Private) => Ok(Some(CallbackNotice::toast(notice(
            "quiz-reveal-sent-private",
        )))),
        Ok(RevealDelivery::OriginChat) => {
            Ok(Some(CallbackNotice::toast(notice("quiz-reveal-sent-here"))))
        }
        Err(QuizError::Authorization { caller, owner }) => {
            info!(session_id, caller, owner, tagged_owner, "Reveal denied");
            Ok(Some(CallbackNotice::alert(notice("quiz-reveal-denied"))))
        }
        Err(e @ QuizError::NotFound(_)) | Err(e @ QuizError::InvalidInput(_)) => {
            debug!(session_id, caller_id, error = %e, "Reveal for unavailable session");
            Ok(Some(CallbackNotice::alert(notice("quiz-reveal-expired"))))
        }
        Err(e) => {
            error_logging::log_quiz_error(&e, "reveal", Some(session_id), Some(caller_id));
            Ok(Some(CallbackNotice::alert(notice("error-generic"))))
        }
    }
}
