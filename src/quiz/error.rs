//! Error taxonomy of the quiz engine.

/// Result type for quiz engine operations
pub type QuizResult<T> = Result<T, QuizError>;

/// Errors raised by the question bank, session store and platform seam
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuizError {
    /// Input rejected before any state was created (e.g. empty question list)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown session, ticket or test reference
    #[error("Not found: {0}")]
    NotFound(String),

    /// A poll reference was registered twice
    #[error("Poll {0} is already registered")]
    DuplicateTicket(String),

    /// The chat platform failed to publish, edit or send
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Someone other than the session owner asked for the owner's results
    #[error("User {caller} may not view results owned by {owner}")]
    Authorization { caller: u64, owner: u64 },

    /// Stored question data does not have the expected shape
    #[error("Malformed question file: {0}")]
    Format(String),

    /// The question bank directory could not be read or written
    #[error("Question bank storage error: {0}")]
    Storage(String),
}

impl QuizError {
    /// Errors that stale events or superseded sessions produce during normal
    /// operation; they are logged at debug level only
    pub fn is_silent(&self) -> bool {
        matches!(self, QuizError::NotFound(_))
    }
}

impl From<csv::Error> for QuizError {
    fn from(err: csv::Error) -> Self {
        QuizError::Format(err.to_string())
    }
}

impl From<crate::path_validation::PathValidationError> for QuizError {
    fn from(err: crate::path_validation::PathValidationError) -> Self {
        QuizError::InvalidInput(err.to_string())
    }
}
