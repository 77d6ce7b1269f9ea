//! Poll Dispatcher: publishes one quiz poll per question, in order.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::error::{QuizError, QuizResult};
use super::platform::{PollRequest, QuizPlatform};
use super::session::SessionId;
use super::store::QuizSessionStore;
use crate::errors::error_logging;
use crate::observability::metrics;
use crate::question_bank::QuestionRecord;

/// Telegram limit on a poll question
pub const POLL_PROMPT_LIMIT: usize = 300;
/// Telegram limit on a poll option
pub const POLL_OPTION_LIMIT: usize = 100;

/// Cut `text` to at most `limit` characters, marking the cut with an ellipsis
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    if limit == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(limit - 1).collect();
    out.push('…');
    out
}

/// Build the poll for question `index` (0-based)
pub fn build_poll(
    index: usize,
    question: &QuestionRecord,
    explanation_limit: usize,
) -> PollRequest {
    let prompt = format!("Q{}. {}", index + 1, question.text());
    let explanation = match question.explanation() {
        "" => None,
        text if explanation_limit == 0 => {
            debug!(len = text.len(), "Explanation dropped by zero limit");
            None
        }
        text => Some(truncate_chars(text, explanation_limit)),
    };

    PollRequest {
        prompt: truncate_chars(&prompt, POLL_PROMPT_LIMIT),
        options: question
            .options()
            .iter()
            .map(|o| truncate_chars(o, POLL_OPTION_LIMIT))
            .collect(),
        correct_index: question.correct_index(),
        explanation,
    }
}

/// What happened during one dispatch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    pub published: usize,
    pub skipped: usize,
    /// The session was retired before every question went out
    pub aborted: bool,
}

pub struct PollDispatcher {
    store: Arc<QuizSessionStore>,
    platform: Arc<dyn QuizPlatform>,
    pacing: Duration,
    explanation_limit: usize,
}

impl PollDispatcher {
    pub fn new(
        store: Arc<QuizSessionStore>,
        platform: Arc<dyn QuizPlatform>,
        pacing: Duration,
        explanation_limit: usize,
    ) -> Self {
        Self {
            store,
            platform,
            pacing,
            explanation_limit,
        }
    }

    /// Publish every question of a session.
    ///
    /// Each ticket is registered before the next poll goes out. A failed
    /// publish removes that question from `pending` and the loop moves on.
    pub async fn publish_all(&self, session_id: SessionId) -> QuizResult<DispatchReport> {
        let session = self
            .store
            .get_session(session_id)
            .ok_or_else(|| QuizError::NotFound(format!("session {}", session_id)))?;

        let mut report = DispatchReport::default();

        for (index, question) in session.questions.iter().enumerate() {
            if index > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            // Superseded or swept while we were pacing
            if !self.store.contains(session_id) {
                info!(session_id, index, "Session retired, stopping dispatch");
                report.aborted = true;
                return Ok(report);
            }

            let poll = build_poll(index, question, self.explanation_limit);
            match self
                .platform
                .publish_poll(session.origin_chat_id, &poll)
                .await
            {
                Ok(poll_ref) => match self.store.register_ticket(&poll_ref, session_id, index) {
                    Ok(()) => {
                        report.published += 1;
                        metrics::record_poll_dispatch(true);
                    }
                    Err(QuizError::NotFound(_)) => {
                        report.aborted = true;
                        return Ok(report);
                    }
                    Err(e) => {
                        warn!(
                            session_id,
                            index,
                            poll_ref = %poll_ref,
                            error = %e,
                            "Could not track published poll"
                        );
                        self.store.skip_question(session_id, index)?;
                        report.skipped += 1;
                        metrics::record_poll_dispatch(false);
                    }
                },
                Err(e) => {
                    error_logging::log_quiz_error(
                        &e,
                        "publish_poll",
                        Some(session_id),
                        Some(session.owner_id),
                    );
                    match self.store.skip_question(session_id, index) {
                        Ok(()) => {}
                        Err(QuizError::NotFound(_)) => {
                            report.aborted = true;
                            return Ok(report);
                        }
                        Err(other) => return Err(other),
                    }
                    report.skipped += 1;
                    metrics::record_poll_dispatch(false);
                }
            }
        }

        debug!(
            session_id,
            published = report.published,
            skipped = report.skipped,
            "Dispatch loop finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdef", 4), "abc…");
        assert_eq!(truncate_chars("नमस्ते दुनिया", 3).chars().count(), 3);
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_build_poll() {
        let long_option = "x".repeat(150);
        let q = QuestionRecord::new(
            "What is 2+2?",
            ["3", "4", "5", long_option.as_str()],
            1,
            "e".repeat(250),
        )
        .unwrap();

        let poll = build_poll(4, &q, 200);
        assert_eq!(poll.prompt, "Q5. What is 2+2?");
        assert_eq!(poll.options.len(), 4);
        assert_eq!(poll.options[3].chars().count(), POLL_OPTION_LIMIT);
        assert_eq!(poll.correct_index, 1);
        assert_eq!(poll.explanation.unwrap().chars().count(), 200);
    }

    #[test]
    fn test_empty_explanation_is_omitted() {
        let q = QuestionRecord::new("Q", ["a", "b", "c", "d"], 0, "").unwrap();
        assert_eq!(build_poll(0, &q, 200).explanation, None);
    }
}
