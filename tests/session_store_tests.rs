//! # Session Store Tests
//!
//! Invariants of the session and ticket tables under interleaved and
//! concurrent answer delivery.

mod test_helpers;

use chrono::{Duration as ChronoDuration, Utc};
use poll_quiz_bot::quiz::{
    sweep_once, AnswerOutcome, IgnoreReason, QuizError, QuizSessionStore, SessionPhase,
};
use std::sync::Arc;
use std::thread;
use test_helpers::questions_with_keys;

const OWNER: u64 = 7;
const CHAT: i64 = 70;

/// Open a session and register `poll-{i}` for every question
fn dispatched(store: &QuizSessionStore, keys: &[usize]) -> u64 {
    let id = store
        .create_session(OWNER, CHAT, questions_with_keys(keys))
        .expect("session");
    let total = store.get_session(id).map(|s| s.total()).unwrap_or_default();
    for i in 0..total {
        store
            .register_ticket(&format!("poll-{}", i), id, i)
            .expect("ticket");
    }
    store.finish_dispatch(id, None).expect("finish");
    id
}

#[test]
fn test_correct_never_exceeds_answered() {
    let keys = [0, 1, 2, 3, 0, 1, 2, 3];
    let store = QuizSessionStore::default();
    let id = dispatched(&store, &keys);

    // Answer in a scrambled order, right on even indices only
    for i in [5usize, 2, 7, 0, 3, 6, 1, 4] {
        let choice = if i % 2 == 0 { keys[i] } else { (keys[i] + 1) % 4 };
        store.record_answer(&format!("poll-{}", i), OWNER, &[choice]);

        if let Some(session) = store.get_session(id) {
            let answered = session.total() - session.pending.len();
            assert!(session.correct_count <= answered);
        }
    }

    let session = store.get_session(id).expect("awaiting reveal");
    assert_eq!(session.correct_count, 4);
    assert_eq!(session.phase, SessionPhase::AwaitingReveal);
}

#[test]
fn test_concurrent_replays_count_once() {
    let store = Arc::new(QuizSessionStore::default());
    let id = dispatched(&store, &[0, 0, 0, 0]);

    let handles: Vec<_> = (0..16)
        .map(|n| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let poll = format!("poll-{}", n % 4);
                store.record_answer(&poll, OWNER, &[0])
            })
        })
        .collect();

    let outcomes: Vec<AnswerOutcome> = handles
        .into_iter()
        .map(|h| h.join().expect("thread"))
        .collect();

    let completions = outcomes
        .iter()
        .filter(|o| matches!(o, AnswerOutcome::Completed { .. }))
        .count();
    let counted = outcomes
        .iter()
        .filter(|o| !matches!(o, AnswerOutcome::Ignored(_)))
        .count();
    assert_eq!(completions, 1);
    assert_eq!(counted, 4);

    let session = store.get_session(id).expect("session");
    assert_eq!(session.correct_count, 4);
    assert_eq!(store.stats().tickets, 0);
}

#[test]
fn test_unknown_poll_is_noop() {
    let store = QuizSessionStore::default();
    let id = dispatched(&store, &[1]);
    let before = store.stats();

    assert_eq!(
        store.record_answer("never-sent", OWNER, &[1]),
        AnswerOutcome::Ignored(IgnoreReason::UnknownPoll)
    );
    assert_eq!(store.resolve_ticket("never-sent"), None);
    assert_eq!(store.stats(), before);
    assert_eq!(store.get_session(id).map(|s| s.pending.len()), Some(1));
}

#[test]
fn test_empty_question_list_rejected() {
    let store = QuizSessionStore::default();
    assert!(matches!(
        store.create_session(OWNER, CHAT, Vec::new()),
        Err(QuizError::InvalidInput(_))
    ));
    assert_eq!(store.stats().sessions(), 0);
}

#[test]
fn test_ticket_outliving_session_is_dropped() {
    let store = QuizSessionStore::default();
    let id = dispatched(&store, &[0, 1]);
    store.retire(id);
    store.retire(id);

    assert_eq!(
        store.record_answer("poll-0", OWNER, &[0]),
        AnswerOutcome::Ignored(IgnoreReason::UnknownPoll)
    );
    assert_eq!(store.stats().tickets, 0);
}

#[test]
fn test_sweep_retires_idle_sessions_in_any_phase() {
    let store = QuizSessionStore::default();
    let dispatching = store
        .create_session(OWNER, CHAT, questions_with_keys(&[0]))
        .expect("session");
    let active = dispatched(&store, &[0, 1]);

    let now = Utc::now();
    assert_eq!(sweep_once(&store, now, ChronoDuration::hours(1)), 0);

    let later = now + ChronoDuration::hours(2);
    assert_eq!(sweep_once(&store, later, ChronoDuration::hours(1)), 2);
    assert!(!store.contains(dispatching));
    assert!(!store.contains(active));
    assert_eq!(store.stats().tickets, 0);
}
