//! Per-run quiz state: questions, outstanding indices and the running tally.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::question_bank::QuestionRecord;

/// Identifier of one quiz run
pub type SessionId = u64;

/// Where a sent message lives, so it can be edited later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i32,
}

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// Polls are still being published
    Dispatching,
    /// All polls are out; waiting for answers
    Active,
    /// Score published; kept only so the owner can reveal answers
    AwaitingReveal,
    /// The owner's review is being delivered
    Revealing,
}

impl SessionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::Dispatching => "dispatching",
            SessionPhase::Active => "active",
            SessionPhase::AwaitingReveal => "awaiting_reveal",
            SessionPhase::Revealing => "revealing",
        }
    }

    /// The score has been published
    pub fn is_finished(self) -> bool {
        matches!(self, SessionPhase::AwaitingReveal | SessionPhase::Revealing)
    }
}

/// Everything needed to open a session
#[derive(Debug, Clone)]
pub struct SessionLaunch {
    pub owner_id: u64,
    pub origin_chat_id: i64,
    pub questions: Vec<QuestionRecord>,
    pub language_code: Option<String>,
    pub test_label: String,
}

impl SessionLaunch {
    pub fn new(owner_id: u64, origin_chat_id: i64, questions: Vec<QuestionRecord>) -> Self {
        Self {
            owner_id,
            origin_chat_id,
            questions,
            language_code: None,
            test_label: String::new(),
        }
    }

    pub fn with_language(mut self, language_code: Option<String>) -> Self {
        self.language_code = language_code;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.test_label = label.into();
        self
    }
}

/// One user's attempt at an ordered list of questions.
///
/// Snapshots handed out by the store are clones; mutation only happens
/// inside the store's critical section.
#[derive(Debug, Clone)]
pub struct QuizSession {
    pub id: SessionId,
    pub owner_id: u64,
    pub origin_chat_id: i64,
    pub questions: Vec<QuestionRecord>,
    pub pending: BTreeSet<usize>,
    pub correct_count: usize,
    /// Owner's chosen option indices per question
    pub answers: Vec<Option<Vec<usize>>>,
    /// Questions whose poll was never delivered
    pub skipped: BTreeSet<usize>,
    pub result_message_ref: Option<MessageRef>,
    pub phase: SessionPhase,
    pub language_code: Option<String>,
    pub test_label: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl QuizSession {
    pub(crate) fn open(id: SessionId, launch: SessionLaunch, now: DateTime<Utc>) -> Self {
        let count = launch.questions.len();
        Self {
            id,
            owner_id: launch.owner_id,
            origin_chat_id: launch.origin_chat_id,
            questions: launch.questions,
            pending: (0..count).collect(),
            correct_count: 0,
            answers: vec![None; count],
            skipped: BTreeSet::new(),
            result_message_ref: None,
            phase: SessionPhase::Dispatching,
            language_code: launch.language_code,
            test_label: launch.test_label,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn delivered_count(&self) -> usize {
        self.total() - self.skipped.len()
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }
}
