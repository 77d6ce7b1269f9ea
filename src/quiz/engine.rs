//! Quiz engine: wires the question bank, session store, dispatcher,
//! collector and publisher behind one cloneable handle for the bot layer.

use std::sync::Arc;

use tracing::{debug, info, warn, Instrument};

use super::collector::AnswerCollector;
use super::dispatcher::{DispatchReport, PollDispatcher};
use super::error::{QuizError, QuizResult};
use super::platform::QuizPlatform;
use super::publisher::{ResultPublisher, RevealDelivery};
use super::session::{SessionId, SessionLaunch};
use super::store::{AnswerOutcome, QuizSessionStore};
use crate::config::QuizConfig;
use crate::errors::error_logging;
use crate::localization::{t_args_lang, t_lang, LocalizationManager};
use crate::observability::{metrics, quiz_span};
use crate::question_bank::{QuestionBank, TestRef};

/// Who asked for a quiz run, and where it should be played
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizRequest {
    pub test: TestRef,
    pub owner_id: u64,
    pub chat_id: i64,
    pub language_code: Option<String>,
}

#[derive(Clone)]
pub struct QuizEngine {
    store: Arc<QuizSessionStore>,
    bank: Arc<dyn QuestionBank>,
    platform: Arc<dyn QuizPlatform>,
    dispatcher: Arc<PollDispatcher>,
    collector: Arc<AnswerCollector>,
    publisher: Arc<ResultPublisher>,
    localization: Arc<LocalizationManager>,
}

impl QuizEngine {
    pub fn new(
        store: Arc<QuizSessionStore>,
        bank: Arc<dyn QuestionBank>,
        platform: Arc<dyn QuizPlatform>,
        localization: Arc<LocalizationManager>,
        config: &QuizConfig,
    ) -> Self {
        let dispatcher = Arc::new(PollDispatcher::new(
            Arc::clone(&store),
            Arc::clone(&platform),
            config.poll_pacing(),
            config.explanation_limit,
        ));
        let publisher = Arc::new(ResultPublisher::new(
            Arc::clone(&store),
            Arc::clone(&platform),
            Arc::clone(&localization),
        ));
        let collector = Arc::new(AnswerCollector::new(
            Arc::clone(&store),
            Arc::clone(&publisher),
        ));

        Self {
            store,
            bank,
            platform,
            dispatcher,
            collector,
            publisher,
            localization,
        }
    }

    pub fn store(&self) -> &Arc<QuizSessionStore> {
        &self.store
    }

    /// Load the test and open a session for it.
    ///
    /// Any unfinished run of the same owner is retired first, so its
    /// remaining polls no longer count.
    pub fn start_session(&self, request: &QuizRequest) -> QuizResult<SessionId> {
        let questions = self.bank.load(&request.test)?;
        if questions.is_empty() {
            return Err(QuizError::InvalidInput(format!(
                "test {} has no valid questions",
                request.test.label()
            )));
        }

        self.store.retire_unfinished_for_owner(request.owner_id);

        let launch = SessionLaunch::new(request.owner_id, request.chat_id, questions)
            .with_language(request.language_code.clone())
            .with_label(request.test.label());
        let session_id = self.store.open_session(launch)?;

        let count = self
            .store
            .get_session(session_id)
            .map(|s| s.total())
            .unwrap_or_default();
        metrics::record_session_started(count);
        info!(
            session_id,
            owner_id = request.owner_id,
            chat_id = request.chat_id,
            test = %request.test.label(),
            questions = count,
            "Quiz session started"
        );

        Ok(session_id)
    }

    /// Start a session and run its dispatch in the background
    pub fn launch(&self, request: &QuizRequest) -> QuizResult<SessionId> {
        let session_id = self.start_session(request)?;

        let engine = self.clone();
        tokio::spawn(
            async move {
                match engine.run_dispatch(session_id).await {
                    Ok(_) => {}
                    // Superseded before the first poll went out
                    Err(e) if e.is_silent() => debug!(session_id, error = %e, "Dispatch skipped"),
                    Err(e) => {
                        error_logging::log_quiz_error(&e, "run_dispatch", Some(session_id), None)
                    }
                }
            }
            .instrument(quiz_span("dispatch", Some(session_id))),
        );

        Ok(session_id)
    }

    /// Publish every poll, then post the result placeholder.
    ///
    /// When nothing could be published the owner is told and the session
    /// is retired. If all answers arrived before the placeholder existed,
    /// the score is published from here.
    pub async fn run_dispatch(&self, session_id: SessionId) -> QuizResult<DispatchReport> {
        let session = self
            .store
            .get_session(session_id)
            .ok_or_else(|| QuizError::NotFound(format!("session {}", session_id)))?;
        let lang = session.language_code.as_deref();

        let intro = t_args_lang(
            &self.localization,
            "quiz-starting",
            &[
                ("test", &teloxide::utils::html::escape(&session.test_label)),
                ("count", &session.total().to_string()),
            ],
            lang,
        );
        if let Err(e) = self
            .platform
            .send_text(session.origin_chat_id, &intro, None)
            .await
        {
            warn!(session_id, error = %e, "Could not announce quiz start");
        }

        let report = self.dispatcher.publish_all(session_id).await?;
        if report.aborted {
            debug!(session_id, "Dispatch aborted, session already retired");
            return Ok(report);
        }

        if report.published == 0 {
            self.store.retire(session_id);
            let text = t_lang(&self.localization, "quiz-delivery-failed", lang);
            self.platform
                .send_text(session.origin_chat_id, &text, None)
                .await?;
            return Ok(report);
        }

        let mut text = t_args_lang(
            &self.localization,
            "quiz-placeholder",
            &[("count", &report.published.to_string())],
            lang,
        );
        if report.skipped > 0 {
            text.push('\n');
            text.push_str(&t_args_lang(
                &self.localization,
                "quiz-partial-delivery",
                &[("skipped", &report.skipped.to_string())],
                lang,
            ));
        }

        let placeholder = match self
            .platform
            .send_text(session.origin_chat_id, &text, None)
            .await
        {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(session_id, error = %e, "Could not post result placeholder");
                None
            }
        };

        match self.store.finish_dispatch(session_id, placeholder) {
            Ok(Some(completion)) => {
                self.publisher.publish_score(&completion).await?;
            }
            Ok(None) => {}
            Err(QuizError::NotFound(_)) => {
                debug!(session_id, "Session retired before dispatch finished");
                return Ok(DispatchReport {
                    aborted: true,
                    ..report
                });
            }
            Err(e) => return Err(e),
        }

        info!(
            session_id,
            published = report.published,
            skipped = report.skipped,
            "Quiz dispatched"
        );
        Ok(report)
    }

    pub async fn on_poll_answered(
        &self,
        poll_ref: &str,
        voter_id: u64,
        chosen: &[usize],
    ) -> AnswerOutcome {
        self.collector
            .on_poll_answered(poll_ref, voter_id, chosen)
            .await
    }

    pub async fn reveal(
        &self,
        session_id: SessionId,
        caller_id: u64,
    ) -> QuizResult<RevealDelivery> {
        self.publisher.reveal(session_id, caller_id).await
    }
}
