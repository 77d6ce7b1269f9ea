//! # Quiz Session Store
//!
//! Owns the session table and the poll ticket table. Both live behind a
//! single lock so that resolving a ticket and updating the tally happen in
//! one critical section: an answer is counted at most once no matter how
//! many handler threads see the same poll event.
//!
//! Platform I/O never happens while the lock is held; operations return
//! plain values (snapshots, [`Completion`]) that callers act on afterwards.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::{debug, info};

use super::error::{QuizError, QuizResult};
use super::session::{MessageRef, QuizSession, SessionId, SessionLaunch, SessionPhase};
use crate::question_bank::QuestionRecord;

/// Default cap on questions per run
pub const DEFAULT_MAX_QUESTIONS: usize = 20;

/// Mapping from a published poll to the question it carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTicket {
    pub session_id: SessionId,
    pub question_index: usize,
}

/// Data the result publisher needs once every delivered question is answered
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub session_id: SessionId,
    pub owner_id: u64,
    pub origin_chat_id: i64,
    pub correct_count: usize,
    pub total: usize,
    pub result_message: Option<MessageRef>,
    pub language_code: Option<String>,
}

impl Completion {
    fn from_session(session: &QuizSession) -> Self {
        Self {
            session_id: session.id,
            owner_id: session.owner_id,
            origin_chat_id: session.origin_chat_id,
            correct_count: session.correct_count,
            total: session.total(),
            result_message: session.result_message_ref,
            language_code: session.language_code.clone(),
        }
    }
}

/// Why an answer event changed nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Never registered, already consumed, or retired with its session
    UnknownPoll,
    /// The ticket outlived its session
    SessionGone,
    /// Someone other than the owner voted on a poll in a shared chat
    NotOwner,
}

impl IgnoreReason {
    pub fn as_str(self) -> &'static str {
        match self {
            IgnoreReason::UnknownPoll => "unknown_poll",
            IgnoreReason::SessionGone => "session_gone",
            IgnoreReason::NotOwner => "not_owner",
        }
    }
}

/// Result of feeding one poll answer into the store
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerOutcome {
    Ignored(IgnoreReason),
    Recorded {
        session_id: SessionId,
        question_index: usize,
        correct: bool,
    },
    /// The answer emptied `pending`; fires exactly once per session
    Completed {
        question_index: usize,
        correct: bool,
        completion: Completion,
    },
}

/// Counts exposed to health checks and gauges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub dispatching: usize,
    pub active: usize,
    pub awaiting_reveal: usize,
    pub tickets: usize,
}

impl StoreStats {
    pub fn sessions(&self) -> usize {
        self.dispatching + self.active + self.awaiting_reveal
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    sessions: HashMap<SessionId, QuizSession>,
    tickets: HashMap<String, PollTicket>,
    next_id: SessionId,
}

impl StoreInner {
    fn drop_session(&mut self, session_id: SessionId) -> Option<QuizSession> {
        let session = self.sessions.remove(&session_id)?;
        self.tickets.retain(|_, t| t.session_id != session_id);
        Some(session)
    }
}

/// In-memory session and ticket tables shared by dispatcher, collector and publisher
#[derive(Debug)]
pub struct QuizSessionStore {
    inner: Mutex<StoreInner>,
    max_questions: usize,
}

impl Default for QuizSessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_QUESTIONS)
    }
}

impl QuizSessionStore {
    pub fn new(max_questions: usize) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                next_id: 1,
                ..StoreInner::default()
            }),
            max_questions: max_questions.max(1),
        }
    }

    /// Open a session with no label or language.
    ///
    /// Fails with `InvalidInput` when `questions` is empty. Longer lists are
    /// truncated to the configured maximum.
    pub fn create_session(
        &self,
        owner_id: u64,
        origin_chat_id: i64,
        questions: Vec<QuestionRecord>,
    ) -> QuizResult<SessionId> {
        self.open_session(SessionLaunch::new(owner_id, origin_chat_id, questions))
    }

    pub fn open_session(&self, mut launch: SessionLaunch) -> QuizResult<SessionId> {
        if launch.questions.is_empty() {
            return Err(QuizError::InvalidInput(
                "a quiz needs at least one question".to_string(),
            ));
        }
        let available = launch.questions.len();
        launch.questions.truncate(self.max_questions);

        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;

        let session = QuizSession::open(id, launch, Utc::now());
        info!(
            session_id = id,
            owner_id = session.owner_id,
            chat_id = session.origin_chat_id,
            questions = session.total(),
            available,
            "Quiz session created"
        );
        inner.sessions.insert(id, session);
        Ok(id)
    }

    pub fn get_session(&self, session_id: SessionId) -> Option<QuizSession> {
        self.inner.lock().sessions.get(&session_id).cloned()
    }

    pub fn contains(&self, session_id: SessionId) -> bool {
        self.inner.lock().sessions.contains_key(&session_id)
    }

    /// Map a published poll to its question.
    ///
    /// Poll references are globally unique, so a second registration of the
    /// same reference is a `DuplicateTicket` error.
    pub fn register_ticket(
        &self,
        poll_ref: &str,
        session_id: SessionId,
        question_index: usize,
    ) -> QuizResult<()> {
        let mut inner = self.inner.lock();

        if inner.tickets.contains_key(poll_ref) {
            return Err(QuizError::DuplicateTicket(poll_ref.to_string()));
        }

        let session = inner
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| QuizError::NotFound(format!("session {}", session_id)))?;

        if !session.pending.contains(&question_index) {
            return Err(QuizError::InvalidInput(format!(
                "question {} of session {} is not pending",
                question_index, session_id
            )));
        }
        session.touch(Utc::now());

        inner.tickets.insert(
            poll_ref.to_string(),
            PollTicket {
                session_id,
                question_index,
            },
        );
        debug!(poll_ref, session_id, question_index, "Ticket registered");
        Ok(())
    }

    /// Remove and return a ticket. Unknown or consumed references yield `None`.
    pub fn resolve_ticket(&self, poll_ref: &str) -> Option<PollTicket> {
        self.inner.lock().tickets.remove(poll_ref)
    }

    /// Take a question out of the run because its poll was never delivered
    pub fn skip_question(&self, session_id: SessionId, question_index: usize) -> QuizResult<()> {
        let mut inner = self.inner.lock();
        let session = inner
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| QuizError::NotFound(format!("session {}", session_id)))?;

        if session.pending.remove(&question_index) {
            session.skipped.insert(question_index);
            session.touch(Utc::now());
        }
        Ok(())
    }

    /// Mark dispatch finished and attach the placeholder result message.
    ///
    /// If every delivered poll was already answered while dispatch was still
    /// running, completion fires here instead of in the collector.
    pub fn finish_dispatch(
        &self,
        session_id: SessionId,
        result_message: Option<MessageRef>,
    ) -> QuizResult<Option<Completion>> {
        let mut inner = self.inner.lock();
        let session = inner
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| QuizError::NotFound(format!("session {}", session_id)))?;

        if session.phase != SessionPhase::Dispatching {
            return Ok(None);
        }

        session.result_message_ref = result_message;
        session.touch(Utc::now());

        if session.pending.is_empty() {
            session.phase = SessionPhase::AwaitingReveal;
            Ok(Some(Completion::from_session(session)))
        } else {
            session.phase = SessionPhase::Active;
            Ok(None)
        }
    }

    /// Apply one poll answer.
    ///
    /// Ticket resolution, the tally update and completion detection all
    /// happen under one lock acquisition. A vote from anyone but the owner
    /// leaves the ticket in place.
    pub fn record_answer(&self, poll_ref: &str, voter_id: u64, chosen: &[usize]) -> AnswerOutcome {
        let mut inner = self.inner.lock();

        let Some(ticket) = inner.tickets.get(poll_ref).copied() else {
            return AnswerOutcome::Ignored(IgnoreReason::UnknownPoll);
        };

        let owner = match inner.sessions.get(&ticket.session_id) {
            Some(session) => session.owner_id,
            None => {
                inner.tickets.remove(poll_ref);
                return AnswerOutcome::Ignored(IgnoreReason::SessionGone);
            }
        };
        if owner != voter_id {
            return AnswerOutcome::Ignored(IgnoreReason::NotOwner);
        }

        inner.tickets.remove(poll_ref);
        let Some(session) = inner.sessions.get_mut(&ticket.session_id) else {
            return AnswerOutcome::Ignored(IgnoreReason::SessionGone);
        };

        let index = ticket.question_index;
        if !session.pending.remove(&index) {
            return AnswerOutcome::Ignored(IgnoreReason::UnknownPoll);
        }

        let correct = session.questions[index].is_correct(chosen);
        if correct {
            session.correct_count += 1;
        }
        session.answers[index] = Some(chosen.to_vec());
        session.touch(Utc::now());

        if session.pending.is_empty() && session.phase == SessionPhase::Active {
            session.phase = SessionPhase::AwaitingReveal;
            AnswerOutcome::Completed {
                question_index: index,
                correct,
                completion: Completion::from_session(session),
            }
        } else {
            AnswerOutcome::Recorded {
                session_id: session.id,
                question_index: index,
                correct,
            }
        }
    }

    /// Check that `caller_id` owns a completed session and claim it for the
    /// review.
    ///
    /// The session moves to `Revealing`, so a second reveal arriving before
    /// the first finishes is rejected. A denied attempt leaves the session
    /// untouched.
    pub fn authorize_reveal(
        &self,
        session_id: SessionId,
        caller_id: u64,
    ) -> QuizResult<QuizSession> {
        let mut inner = self.inner.lock();
        let session = inner
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| QuizError::NotFound(format!("session {}", session_id)))?;

        if session.owner_id != caller_id {
            return Err(QuizError::Authorization {
                caller: caller_id,
                owner: session.owner_id,
            });
        }
        match session.phase {
            SessionPhase::AwaitingReveal => {}
            SessionPhase::Revealing => {
                return Err(QuizError::InvalidInput(format!(
                    "answers of session {} are already being revealed",
                    session_id
                )));
            }
            _ => {
                return Err(QuizError::InvalidInput(format!(
                    "session {} has not finished",
                    session_id
                )));
            }
        }

        session.phase = SessionPhase::Revealing;
        session.touch(Utc::now());
        Ok(session.clone())
    }

    /// Hand a claimed session back after its review could not be delivered
    pub fn release_reveal(&self, session_id: SessionId) {
        let mut inner = self.inner.lock();
        if let Some(session) = inner.sessions.get_mut(&session_id) {
            if session.phase == SessionPhase::Revealing {
                session.phase = SessionPhase::AwaitingReveal;
            }
        }
    }

    /// Remove a session and its outstanding tickets. Idempotent.
    pub fn retire(&self, session_id: SessionId) -> Option<QuizSession> {
        let removed = self.inner.lock().drop_session(session_id);
        if let Some(session) = &removed {
            debug!(
                session_id,
                phase = session.phase.as_str(),
                "Quiz session retired"
            );
        }
        removed
    }

    /// Retire every session of `owner_id` that has not reached its score.
    ///
    /// Used when the owner launches a new run; finished sessions stay so
    /// their answers can still be revealed.
    pub fn retire_unfinished_for_owner(&self, owner_id: u64) -> Vec<SessionId> {
        let mut inner = self.inner.lock();
        let ids: Vec<SessionId> = inner
            .sessions
            .values()
            .filter(|s| s.owner_id == owner_id && !s.phase.is_finished())
            .map(|s| s.id)
            .collect();

        for id in &ids {
            inner.drop_session(*id);
        }
        if !ids.is_empty() {
            let superseded = ids.len();
            info!(owner_id, superseded, "Superseded unfinished sessions");
        }
        ids
    }

    /// Retire sessions idle for longer than `idle_timeout` as of `now`
    pub fn sweep_idle(&self, now: DateTime<Utc>, idle_timeout: Duration) -> Vec<QuizSession> {
        let mut inner = self.inner.lock();
        let stale: Vec<SessionId> = inner
            .sessions
            .values()
            .filter(|s| now - s.last_activity > idle_timeout)
            .map(|s| s.id)
            .collect();

        stale
            .into_iter()
            .filter_map(|id| inner.drop_session(id))
            .collect()
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.lock();
        let mut stats = StoreStats {
            tickets: inner.tickets.len(),
            ..StoreStats::default()
        };
        for session in inner.sessions.values() {
            match session.phase {
                SessionPhase::Dispatching => stats.dispatching += 1,
                SessionPhase::Active => stats.active += 1,
                SessionPhase::AwaitingReveal | SessionPhase::Revealing => {
                    stats.awaiting_reveal += 1
                }
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions(correct: &[usize]) -> Vec<QuestionRecord> {
        correct
            .iter()
            .enumerate()
            .map(|(i, c)| {
                QuestionRecord::new(format!("Q{}", i), ["a", "b", "c", "d"], *c, "").unwrap()
            })
            .collect()
    }

    fn dispatched(store: &QuizSessionStore, owner: u64, correct: &[usize]) -> SessionId {
        let id = store
            .create_session(owner, -100, questions(correct))
            .unwrap();
        for i in 0..correct.len() {
            store
                .register_ticket(&format!("p{}-{}", id, i), id, i)
                .unwrap();
        }
        store.finish_dispatch(id, None).unwrap();
        id
    }

    #[test]
    fn test_create_rejects_empty_and_truncates() {
        let store = QuizSessionStore::new(3);
        assert!(matches!(
            store.create_session(1, 1, vec![]),
            Err(QuizError::InvalidInput(_))
        ));

        let id = store.create_session(1, 1, questions(&[0; 5])).unwrap();
        let session = store.get_session(id).unwrap();
        assert_eq!(session.total(), 3);
        assert_eq!(session.pending.len(), 3);
        assert_eq!(session.correct_count, 0);
        assert_eq!(session.phase, SessionPhase::Dispatching);
    }

    #[test]
    fn test_register_ticket_errors() {
        let store = QuizSessionStore::default();
        let id = store.create_session(1, 1, questions(&[0, 1])).unwrap();

        store.register_ticket("poll", id, 0).unwrap();
        assert_eq!(
            store.register_ticket("poll", id, 1),
            Err(QuizError::DuplicateTicket("poll".to_string()))
        );
        assert!(matches!(
            store.register_ticket("other", 99, 0),
            Err(QuizError::NotFound(_))
        ));
        assert!(matches!(
            store.register_ticket("far", id, 7),
            Err(QuizError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_resolve_ticket_consumes_once() {
        let store = QuizSessionStore::default();
        let id = store.create_session(1, 1, questions(&[0])).unwrap();
        store.register_ticket("poll", id, 0).unwrap();

        assert_eq!(
            store.resolve_ticket("poll"),
            Some(PollTicket {
                session_id: id,
                question_index: 0
            })
        );
        assert_eq!(store.resolve_ticket("poll"), None);
        assert_eq!(store.resolve_ticket("never"), None);
    }

    #[test]
    fn test_completion_fires_once() {
        let store = QuizSessionStore::default();
        let id = dispatched(&store, 7, &[0, 1]);

        let first = store.record_answer(&format!("p{}-0", id), 7, &[0]);
        assert!(matches!(first, AnswerOutcome::Recorded { correct: true, .. }));

        let second = store.record_answer(&format!("p{}-1", id), 7, &[0]);
        match second {
            AnswerOutcome::Completed { completion, correct, .. } => {
                assert!(!correct);
                assert_eq!(completion.correct_count, 1);
                assert_eq!(completion.total, 2);
            }
            other => panic!("expected completion, got {:?}", other),
        }

        let replay = store.record_answer(&format!("p{}-1", id), 7, &[1]);
        assert_eq!(replay, AnswerOutcome::Ignored(IgnoreReason::UnknownPoll));
        assert_eq!(store.get_session(id).unwrap().correct_count, 1);
    }

    #[test]
    fn test_non_owner_vote_keeps_ticket() {
        let store = QuizSessionStore::default();
        let id = dispatched(&store, 7, &[2]);
        let poll = format!("p{}-0", id);

        assert_eq!(
            store.record_answer(&poll, 8, &[2]),
            AnswerOutcome::Ignored(IgnoreReason::NotOwner)
        );
        assert!(matches!(
            store.record_answer(&poll, 7, &[2]),
            AnswerOutcome::Completed { correct: true, .. }
        ));
    }

    #[test]
    fn test_answers_before_finish_complete_at_finish() {
        let store = QuizSessionStore::default();
        let id = store.create_session(1, 1, questions(&[0])).unwrap();
        store.register_ticket("early", id, 0).unwrap();

        assert!(matches!(
            store.record_answer("early", 1, &[0]),
            AnswerOutcome::Recorded { .. }
        ));

        let completion = store.finish_dispatch(id, None).unwrap().unwrap();
        assert_eq!(completion.correct_count, 1);
        assert_eq!(store.finish_dispatch(id, None).unwrap(), None);
    }

    #[test]
    fn test_skip_question_leaves_pending() {
        let store = QuizSessionStore::default();
        let id = store.create_session(1, 1, questions(&[0, 0])).unwrap();
        store.skip_question(id, 1).unwrap();

        let session = store.get_session(id).unwrap();
        assert_eq!(session.pending.len(), 1);
        assert!(session.skipped.contains(&1));
        assert_eq!(session.delivered_count(), 1);
    }

    #[test]
    fn test_authorize_reveal() {
        let store = QuizSessionStore::default();
        let id = dispatched(&store, 7, &[0]);

        assert!(matches!(
            store.authorize_reveal(id, 7),
            Err(QuizError::InvalidInput(_))
        ));
        store.record_answer(&format!("p{}-0", id), 7, &[0]);

        let before = store.get_session(id).unwrap();
        assert_eq!(
            store.authorize_reveal(id, 8).unwrap_err(),
            QuizError::Authorization { caller: 8, owner: 7 }
        );
        let after = store.get_session(id).unwrap();
        assert_eq!(before.last_activity, after.last_activity);
        assert_eq!(before.phase, after.phase);

        assert_eq!(store.authorize_reveal(id, 7).unwrap().correct_count, 1);
    }

    #[test]
    fn test_reveal_claim_is_exclusive_until_released() {
        let store = QuizSessionStore::default();
        let id = dispatched(&store, 7, &[0]);
        store.record_answer(&format!("p{}-0", id), 7, &[0]);

        store.authorize_reveal(id, 7).unwrap();
        assert_eq!(
            store.get_session(id).unwrap().phase,
            SessionPhase::Revealing
        );
        assert!(matches!(
            store.authorize_reveal(id, 7),
            Err(QuizError::InvalidInput(_))
        ));
        // A claimed session still counts as finished
        assert!(store.retire_unfinished_for_owner(7).is_empty());
        assert_eq!(store.stats().awaiting_reveal, 1);

        store.release_reveal(id);
        assert_eq!(
            store.get_session(id).unwrap().phase,
            SessionPhase::AwaitingReveal
        );
        assert!(store.authorize_reveal(id, 7).is_ok());
    }

    #[test]
    fn test_retire_is_idempotent_and_drops_tickets() {
        let store = QuizSessionStore::default();
        let id = dispatched(&store, 1, &[0, 1]);
        assert_eq!(store.stats().tickets, 2);

        assert!(store.retire(id).is_some());
        assert!(store.retire(id).is_none());
        assert_eq!(store.stats(), StoreStats::default());
    }

    #[test]
    fn test_retire_unfinished_for_owner() {
        let store = QuizSessionStore::default();
        let unfinished = dispatched(&store, 1, &[0]);
        let finished = dispatched(&store, 1, &[0]);
        store.record_answer(&format!("p{}-0", finished), 1, &[0]);
        let other = dispatched(&store, 2, &[0]);

        assert_eq!(store.retire_unfinished_for_owner(1), vec![unfinished]);
        assert!(store.get_session(finished).is_some());
        assert!(store.get_session(other).is_some());
    }

    #[test]
    fn test_sweep_idle() {
        let store = QuizSessionStore::default();
        let id = dispatched(&store, 1, &[0]);

        assert!(store.sweep_idle(Utc::now(), Duration::hours(1)).is_empty());
        let swept = store.sweep_idle(Utc::now() + Duration::hours(2), Duration::hours(1));
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].id, id);
        assert_eq!(store.stats().tickets, 0);
    }
}
