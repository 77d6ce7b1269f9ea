//! Answer Collector: one poll answer event at a time.

use std::sync::Arc;

use tracing::debug;

use super::publisher::ResultPublisher;
use super::store::{AnswerOutcome, QuizSessionStore};
use crate::errors::error_logging;
use crate::observability::metrics;

pub struct AnswerCollector {
    store: Arc<QuizSessionStore>,
    publisher: Arc<ResultPublisher>,
}

impl AnswerCollector {
    pub fn new(store: Arc<QuizSessionStore>, publisher: Arc<ResultPublisher>) -> Self {
        Self { store, publisher }
    }

    /// Apply an answer and publish the score if it completed the session.
    ///
    /// Unknown, consumed and foreign polls are dropped without error, so the
    /// same event can be replayed safely.
    pub async fn on_poll_answered(
        &self,
        poll_ref: &str,
        voter_id: u64,
        chosen: &[usize],
    ) -> AnswerOutcome {
        let outcome = self.store.record_answer(poll_ref, voter_id, chosen);

        match &outcome {
            AnswerOutcome::Ignored(reason) => {
                debug!(poll_ref, voter_id, reason = %reason.as_str(), "Poll answer ignored");
                metrics::record_answer(reason.as_str());
            }
            AnswerOutcome::Recorded {
                session_id,
                question_index,
                correct,
            } => {
                debug!(session_id, question_index, correct, "Poll answer recorded");
                metrics::record_answer(if *correct { "correct" } else { "incorrect" });
            }
            AnswerOutcome::Completed {
                correct,
                completion,
                ..
            } => {
                metrics::record_answer(if *correct { "correct" } else { "incorrect" });
                if let Err(e) = self.publisher.publish_score(completion).await {
                    error_logging::log_quiz_error(
                        &e,
                        "publish_score",
                        Some(completion.session_id),
                        Some(completion.owner_id),
                    );
                }
            }
        }

        outcome
    }
}
