//! The quiz fragment: session state machine, poll fan-out and answer fan-in.

pub mod collector;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod platform;
pub mod publisher;
pub mod session;
pub mod store;
pub mod sweeper;

pub use collector::AnswerCollector;
pub use dispatcher::{build_poll, truncate_chars, DispatchReport, PollDispatcher};
pub use engine::{QuizEngine, QuizRequest};
pub use error::{QuizError, QuizResult};
pub use platform::{PollRequest, PrivateDelivery, QuizPlatform, RevealControl};
pub use publisher::{ResultPublisher, RevealDelivery, MESSAGE_CHUNK_LIMIT};
pub use session::{MessageRef, QuizSession, SessionId, SessionLaunch, SessionPhase};
pub use store::{
    AnswerOutcome, Completion, IgnoreReason, QuizSessionStore, StoreStats, DEFAULT_MAX_QUESTIONS,
};
pub use sweeper::{spawn_idle_sweeper, sweep_once};
