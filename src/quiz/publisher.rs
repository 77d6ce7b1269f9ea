//! Result Publisher: the score message and the owner-only answer review.

use std::sync::Arc;

use teloxide::utils::html;
use tracing::{info, warn};

use super::dispatcher::truncate_chars;
use super::error::{QuizError, QuizResult};
use super::platform::{PrivateDelivery, QuizPlatform, RevealControl};
use super::session::{MessageRef, QuizSession, SessionId};
use super::store::{Completion, QuizSessionStore};
use crate::localization::{t_args_lang, t_lang, LocalizationManager};
use crate::observability::metrics;
use crate::question_bank::OPTION_LETTERS;

/// Telegram rejects messages above 4096 characters; keep headroom for entities
pub const MESSAGE_CHUNK_LIMIT: usize = 3800;

const REVIEW_TEXT_LIMIT: usize = 1000;
const REVIEW_OPTION_LIMIT: usize = 300;

/// Where an authorized reveal ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealDelivery {
    Private,
    /// Private chat unreachable; posted where the quiz ran
    OriginChat,
}

pub struct ResultPublisher {
    store: Arc<QuizSessionStore>,
    platform: Arc<dyn QuizPlatform>,
    localization: Arc<LocalizationManager>,
}

impl ResultPublisher {
    pub fn new(
        store: Arc<QuizSessionStore>,
        platform: Arc<dyn QuizPlatform>,
        localization: Arc<LocalizationManager>,
    ) -> Self {
        Self {
            store,
            platform,
            localization,
        }
    }

    /// Show the score in place of the placeholder, with the reveal control.
    ///
    /// Falls back to a fresh message when there is no placeholder or it can
    /// no longer be edited.
    pub async fn publish_score(&self, completion: &Completion) -> QuizResult<MessageRef> {
        let lang = completion.language_code.as_deref();
        let text = t_args_lang(
            &self.localization,
            "quiz-score",
            &[
                ("correct", &completion.correct_count.to_string()),
                ("total", &completion.total.to_string()),
            ],
            lang,
        );
        let control = RevealControl {
            session_id: completion.session_id,
            owner_id: completion.owner_id,
            label: t_lang(&self.localization, "quiz-show-answers", lang),
        };

        metrics::record_quiz_completed(completion.correct_count, completion.total);
        info!(
            session_id = completion.session_id,
            owner_id = completion.owner_id,
            correct = completion.correct_count,
            total = completion.total,
            "Quiz completed"
        );

        if let Some(message) = completion.result_message {
            match self
                .platform
                .edit_message(&message, &text, Some(&control))
                .await
            {
                Ok(()) => return Ok(message),
                Err(e) => warn!(
                    session_id = completion.session_id,
                    error = %e,
                    "Could not edit result placeholder, sending a new message"
                ),
            }
        }

        self.platform
            .send_text(completion.origin_chat_id, &text, Some(&control))
            .await
    }

    /// Deliver the answer review to the session owner.
    ///
    /// `Authorization` when `caller_id` is not the owner (session untouched),
    /// `NotFound` when the session expired. The session is retired once the
    /// review is delivered, and can be revealed again if delivery failed.
    pub async fn reveal(
        &self,
        session_id: SessionId,
        caller_id: u64,
    ) -> QuizResult<RevealDelivery> {
        let session = match self.store.authorize_reveal(session_id, caller_id) {
            Ok(session) => session,
            Err(e) => {
                metrics::record_reveal(match e {
                    QuizError::Authorization { .. } => "denied",
                    _ => "expired",
                });
                return Err(e);
            }
        };

        let chunks = self.render_review(&session);
        let delivery = match self.deliver(&session, &chunks).await {
            Ok(delivery) => delivery,
            Err(e) => {
                metrics::record_reveal("failed");
                self.store.release_reveal(session_id);
                return Err(e);
            }
        };

        self.store.retire(session_id);
        metrics::record_reveal(match delivery {
            RevealDelivery::Private => "private",
            RevealDelivery::OriginChat => "origin_chat",
        });
        info!(session_id, owner_id = session.owner_id, ?delivery, "Answers revealed");
        Ok(delivery)
    }

    async fn deliver(
        &self,
        session: &QuizSession,
        chunks: &[String],
    ) -> QuizResult<RevealDelivery> {
        let Some((first, rest)) = chunks.split_first() else {
            return Ok(RevealDelivery::Private);
        };

        match self.platform.send_private(session.owner_id, first).await? {
            PrivateDelivery::Delivered => {
                for chunk in rest {
                    if self.platform.send_private(session.owner_id, chunk).await?
                        == PrivateDelivery::Unreachable
                    {
                        return Err(QuizError::Delivery(
                            "private chat closed mid-review".to_string(),
                        ));
                    }
                }
                Ok(RevealDelivery::Private)
            }
            PrivateDelivery::Unreachable => {
                info!(
                    session_id = session.id,
                    owner_id = session.owner_id,
                    "Owner unreachable privately, posting review in origin chat"
                );
                for chunk in chunks {
                    self.platform
                        .send_text(session.origin_chat_id, chunk, None)
                        .await?;
                }
                Ok(RevealDelivery::OriginChat)
            }
        }
    }

    /// Render the owner's review, split at question boundaries into
    /// messages below [`MESSAGE_CHUNK_LIMIT`].
    pub fn render_review(&self, session: &QuizSession) -> Vec<String> {
        let lang = session.language_code.as_deref();
        let loc = &self.localization;

        let header = t_args_lang(
            loc,
            "reveal-header",
            &[("test", &html::escape(&session.test_label))],
            lang,
        );
        let score = t_args_lang(
            loc,
            "quiz-score",
            &[
                ("correct", &session.correct_count.to_string()),
                ("total", &session.total().to_string()),
            ],
            lang,
        );

        let mut blocks = vec![format!("<b>{}</b>\n{}", header, html::escape(&score))];
        for (index, question) in session.questions.iter().enumerate() {
            let mut block = format!(
                "<b>Q{}.</b> {}\n",
                index + 1,
                html::escape(&truncate_chars(question.text(), REVIEW_TEXT_LIMIT))
            );
            for (letter, option) in OPTION_LETTERS.iter().zip(question.options()) {
                block.push_str(&format!(
                    "{}) {}\n",
                    letter,
                    html::escape(&truncate_chars(option, REVIEW_OPTION_LIMIT))
                ));
            }

            block.push_str(&t_args_lang(
                loc,
                "reveal-correct",
                &[("letter", &question.correct_letter().to_string())],
                lang,
            ));
            block.push('\n');

            let own_answer = if session.skipped.contains(&index) {
                t_lang(loc, "reveal-not-delivered", lang)
            } else {
                match session.answers[index].as_deref() {
                    Some(chosen) if !chosen.is_empty() => {
                        describe_choice(question.options(), chosen)
                    }
                    _ => t_lang(loc, "reveal-no-answer", lang),
                }
            };
            block.push_str(&t_args_lang(
                loc,
                "reveal-your-answer",
                &[("answer", &own_answer)],
                lang,
            ));

            if !question.explanation().is_empty() {
                block.push('\n');
                block.push_str(&t_args_lang(
                    loc,
                    "reveal-explanation",
                    &[(
                        "text",
                        &html::escape(&truncate_chars(
                            question.explanation(),
                            REVIEW_TEXT_LIMIT,
                        )),
                    )],
                    lang,
                ));
            }
            blocks.push(block);
        }

        chunk_blocks(blocks, MESSAGE_CHUNK_LIMIT)
    }
}

fn describe_choice(options: &[String], chosen: &[usize]) -> String {
    chosen
        .iter()
        .filter_map(|&i| {
            let letter = OPTION_LETTERS.get(i)?;
            let text = options.get(i)?;
            Some(format!(
                "{}) {}",
                letter,
                html::escape(&truncate_chars(text, REVIEW_OPTION_LIMIT))
            ))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Greedily pack blocks into messages of at most `limit` characters
fn chunk_blocks(blocks: Vec<String>, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for block in blocks {
        let block_len = block.chars().count();
        if !current.is_empty() && current_len + 2 + block_len > limit {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push_str("\n\n");
            current_len += 2;
        }
        current.push_str(&block);
        current_len += block_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_blocks_respects_limit() {
        let blocks = vec!["a".repeat(6), "b".repeat(6), "c".repeat(6)];
        let chunks = chunk_blocks(blocks, 14);
        assert_eq!(
            chunks,
            vec![
                format!("{}\n\n{}", "a".repeat(6), "b".repeat(6)),
                "c".repeat(6)
            ]
        );
    }

    #[test]
    fn test_chunk_blocks_keeps_oversized_block_whole() {
        let chunks = chunk_blocks(vec!["x".repeat(20), "y".to_string()], 10);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 20);
    }

    #[test]
    fn test_describe_choice() {
        let options = ["a", "b", "c", "d"].map(String::from);
        assert_eq!(describe_choice(&options, &[2]), "C) c");
        assert_eq!(describe_choice(&options, &[0, 9]), "A) a");
    }
}
