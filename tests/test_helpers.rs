//! # Test Helper Library
//!
//! Shared setup for the integration tests: a recording in-memory chat
//! platform, question builders and temporary question banks.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use poll_quiz_bot::config::QuizConfig;
use poll_quiz_bot::localization::create_localization_manager;
use poll_quiz_bot::question_bank::{FsQuestionBank, QuestionBank, QuestionRecord, TestRef};
use poll_quiz_bot::quiz::{
    MessageRef, PollRequest, PrivateDelivery, QuizEngine, QuizError, QuizPlatform, QuizResult,
    QuizSessionStore, RevealControl,
};
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

/// One poll the fake platform accepted
#[derive(Debug, Clone)]
pub struct PublishedPoll {
    pub chat_id: i64,
    pub poll: PollRequest,
    pub poll_ref: String,
}

/// One message the fake platform sent or edited
#[derive(Debug, Clone)]
pub struct SentText {
    pub message: MessageRef,
    pub text: String,
    pub control: Option<RevealControl>,
}

#[derive(Debug, Default)]
struct Recorded {
    polls: Vec<PublishedPoll>,
    texts: Vec<SentText>,
    edits: Vec<SentText>,
    private: Vec<(u64, String)>,
    publish_attempts: usize,
    next_message_id: i32,
}

/// In-memory [`QuizPlatform`] that records everything sent through it
#[derive(Debug, Default)]
pub struct FakePlatform {
    recorded: Mutex<Recorded>,
    /// Publish attempts (0-based) that fail
    failing_polls: HashSet<usize>,
    fail_all_polls: bool,
    fail_edits: bool,
    private_unreachable: bool,
    fail_private: bool,
    /// Yield to other tasks before each private message is recorded
    slow_private: bool,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_polls(mut self, attempts: impl IntoIterator<Item = usize>) -> Self {
        self.failing_polls = attempts.into_iter().collect();
        self
    }

    pub fn failing_all_polls(mut self) -> Self {
        self.fail_all_polls = true;
        self
    }

    pub fn failing_edits(mut self) -> Self {
        self.fail_edits = true;
        self
    }

    pub fn private_unreachable(mut self) -> Self {
        self.private_unreachable = true;
        self
    }

    pub fn failing_private(mut self) -> Self {
        self.fail_private = true;
        self
    }

    pub fn slow_private(mut self) -> Self {
        self.slow_private = true;
        self
    }

    pub fn polls(&self) -> Vec<PublishedPoll> {
        self.recorded.lock().polls.clone()
    }

    pub fn poll_refs(&self) -> Vec<String> {
        self.recorded
            .lock()
            .polls
            .iter()
            .map(|p| p.poll_ref.clone())
            .collect()
    }

    pub fn texts(&self) -> Vec<SentText> {
        self.recorded.lock().texts.clone()
    }

    pub fn edits(&self) -> Vec<SentText> {
        self.recorded.lock().edits.clone()
    }

    pub fn private_messages(&self) -> Vec<(u64, String)> {
        self.recorded.lock().private.clone()
    }
}

#[async_trait]
impl QuizPlatform for FakePlatform {
    async fn publish_poll(&self, chat_id: i64, poll: &PollRequest) -> QuizResult<String> {
        let mut recorded = self.recorded.lock();
        let attempt = recorded.publish_attempts;
        recorded.publish_attempts += 1;

        if self.fail_all_polls || self.failing_polls.contains(&attempt) {
            return Err(QuizError::Delivery(format!("attempt {} rejected", attempt)));
        }

        let poll_ref = format!("poll-{}", attempt);
        recorded.polls.push(PublishedPoll {
            chat_id,
            poll: poll.clone(),
            poll_ref: poll_ref.clone(),
        });
        Ok(poll_ref)
    }

    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        control: Option<&RevealControl>,
    ) -> QuizResult<MessageRef> {
        let mut recorded = self.recorded.lock();
        recorded.next_message_id += 1;
        let message = MessageRef {
            chat_id,
            message_id: recorded.next_message_id,
        };
        recorded.texts.push(SentText {
            message,
            text: text.to_string(),
            control: control.cloned(),
        });
        Ok(message)
    }

    async fn edit_message(
        &self,
        message: &MessageRef,
        text: &str,
        control: Option<&RevealControl>,
    ) -> QuizResult<()> {
        if self.fail_edits {
            return Err(QuizError::Delivery("message can't be edited".to_string()));
        }
        self.recorded.lock().edits.push(SentText {
            message: *message,
            text: text.to_string(),
            control: control.cloned(),
        });
        Ok(())
    }

    async fn send_private(&self, user_id: u64, text: &str) -> QuizResult<PrivateDelivery> {
        if self.slow_private {
            tokio::task::yield_now().await;
        }
        if self.fail_private {
            return Err(QuizError::Delivery("private send timed out".to_string()));
        }
        if self.private_unreachable {
            return Ok(PrivateDelivery::Unreachable);
        }
        let entry = (user_id, text.to_string());
        self.recorded.lock().private.push(entry);
        Ok(PrivateDelivery::Delivered)
    }
}

/// A valid question whose correct option is `correct`
pub fn question(n: usize, correct: usize) -> QuestionRecord {
    QuestionRecord::new(
        format!("Question {}", n),
        [
            format!("Option A{}", n),
            format!("Option B{}", n),
            format!("Option C{}", n),
            format!("Option D{}", n),
        ],
        correct,
        format!("Because of reason {}", n),
    )
    .expect("test question is valid")
}

/// One question per answer key, in order
pub fn questions_with_keys(keys: &[usize]) -> Vec<QuestionRecord> {
    keys.iter()
        .enumerate()
        .map(|(i, &k)| question(i + 1, k))
        .collect()
}

/// CSV text with a header and one row per answer key
pub fn csv_with_keys(keys: &[usize]) -> String {
    let mut csv =
        String::from("Question,Option A,Option B,Option C,Option D,Answer,Description\n");
    for (i, key) in keys.iter().enumerate() {
        let letter = ['A', 'B', 'C', 'D'][*key];
        csv.push_str(&format!(
            "Question {n},Option A{n},Option B{n},Option C{n},Option D{n},{letter},Because of reason {n}\n",
            n = i + 1,
            letter = letter
        ));
    }
    csv
}

pub fn sample_test_ref() -> TestRef {
    TestRef::new("Biology", "Cell_Biology", "Mitosis", "Test_1")
}

/// Temporary question bank with `csv` stored at `test`
pub fn bank_with_test(test: &TestRef, csv: &str) -> (TempDir, Arc<FsQuestionBank>) {
    let dir = TempDir::new().expect("temp dir");
    let bank = FsQuestionBank::new(dir.path());
    bank.ensure_path(&[&test.subject, &test.sub_subject, &test.topic])
        .expect("catalog directories");
    fs::write(bank.test_path(test).expect("test path"), csv).expect("write test csv");
    (dir, Arc::new(bank))
}

/// Quiz settings with no pacing so tests run instantly
pub fn fast_quiz_config(max_questions: usize) -> QuizConfig {
    QuizConfig {
        max_questions,
        poll_pacing_ms: 0,
        ..QuizConfig::default()
    }
}

/// Engine wired to a fake platform
pub struct TestEngine {
    pub engine: QuizEngine,
    pub store: Arc<QuizSessionStore>,
    pub platform: Arc<FakePlatform>,
}

pub fn build_engine(
    bank: Arc<FsQuestionBank>,
    platform: FakePlatform,
    max_questions: usize,
) -> TestEngine {
    build_engine_with_config(bank, platform, &fast_quiz_config(max_questions))
}

pub fn build_engine_with_config(
    bank: Arc<FsQuestionBank>,
    platform: FakePlatform,
    config: &QuizConfig,
) -> TestEngine {
    let store = Arc::new(QuizSessionStore::new(config.max_questions));
    let platform = Arc::new(platform);
    let localization = create_localization_manager().expect("localization");
    let bank: Arc<dyn QuestionBank> = bank;
    let dyn_platform: Arc<dyn QuizPlatform> = platform.clone();

    let engine = QuizEngine::new(Arc::clone(&store), bank, dyn_platform, localization, config);

    TestEngine {
        engine,
        store,
        platform,
    }
}
