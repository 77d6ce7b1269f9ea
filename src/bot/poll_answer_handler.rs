//! Poll answer events: the fan-in side of a quiz run.

use anyhow::Result;
use teloxide::types::{MaybeAnonymousUser, PollAnswer};
use tracing::{debug, Instrument};

use super::BotServices;
use crate::observability;
use crate::quiz::AnswerOutcome;

/// Feed one poll answer into the quiz engine.
///
/// Answers cast on behalf of a chat carry no user and cannot belong to a
/// session; they are dropped. An empty `option_ids` is a retracted vote,
/// which quiz polls do not allow, and is dropped as well.
pub async fn poll_answer_handler(answer: PollAnswer, services: BotServices) -> Result<()> {
    let voter_id = match &answer.voter {
        MaybeAnonymousUser::User(user) => user.id.0,
        MaybeAnonymousUser::Chat(_) => {
            debug!(poll_ref = %answer.poll_id, "Ignoring anonymous chat vote");
            return Ok(());
        }
    };
    if answer.option_ids.is_empty() {
        debug!(poll_ref = %answer.poll_id, voter_id, "Ignoring retracted vote");
        return Ok(());
    }

    observability::record_telegram_message("poll_answer");

    let poll_ref = answer.poll_id.to_string();
    let chosen: Vec<usize> = answer.option_ids.iter().map(|&i| usize::from(i)).collect();

    let outcome = services
        .engine
        .on_poll_answered(&poll_ref, voter_id, &chosen)
        .instrument(observability::telegram_span("poll_answer", Some(voter_id)))
        .await;

    if let AnswerOutcome::Completed { completion, .. } = &outcome {
        debug!(session_id = completion.session_id, "Session completed");
    }
    Ok(())
}
