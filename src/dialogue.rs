//! Admin dialogue state for the question upload flow.

use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

use crate::question_bank::{CatalogLevel, TestRef, CATALOG_DEPTH};

/// Conversation state of one chat while an admin edits the catalog
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuizDialogueState {
    #[default]
    Start,
    /// The next text message names a new entry under `parent` (0..=2 segments)
    AwaitingName {
        parent: Vec<String>,
        language_code: Option<String>,
    },
    /// The next document is stored as the test at `path` (4 segments)
    AwaitingUpload {
        path: Vec<String>,
        replacing: bool,
        language_code: Option<String>,
    },
}

impl QuizDialogueState {
    /// Level of the entry an `AwaitingName` state will create
    pub fn naming_level(&self) -> Option<CatalogLevel> {
        match self {
            QuizDialogueState::AwaitingName { parent, .. } => CatalogLevel::from_depth(parent.len())
                .filter(|level| *level != CatalogLevel::Test),
            _ => None,
        }
    }

    /// Test slot an `AwaitingUpload` state will write
    pub fn upload_target(&self) -> Option<TestRef> {
        match self {
            QuizDialogueState::AwaitingUpload { path, .. } if path.len() == CATALOG_DEPTH => {
                TestRef::from_segments(path)
            }
            _ => None,
        }
    }

    pub fn language_code(&self) -> Option<&str> {
        match self {
            QuizDialogueState::Start => None,
            QuizDialogueState::AwaitingName { language_code, .. }
            | QuizDialogueState::AwaitingUpload { language_code, .. } => language_code.as_deref(),
        }
    }
}

/// Type alias for the quiz bot dialogue
pub type QuizDialogue = Dialogue<QuizDialogueState, InMemStorage<QuizDialogueState>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naming_level() {
        let state = QuizDialogueState::AwaitingName {
            parent: vec!["History".to_string()],
            language_code: None,
        };
        assert_eq!(state.naming_level(), Some(CatalogLevel::SubSubject));

        let too_deep = QuizDialogueState::AwaitingName {
            parent: vec!["a".into(), "b".into(), "c".into()],
            language_code: None,
        };
        assert_eq!(too_deep.naming_level(), None);
        assert_eq!(QuizDialogueState::Start.naming_level(), None);
    }

    #[test]
    fn test_upload_target() {
        let state = QuizDialogueState::AwaitingUpload {
            path: vec!["S".into(), "SS".into(), "T".into(), "Test_2".into()],
            replacing: false,
            language_code: Some("hi".to_string()),
        };
        assert_eq!(state.upload_target(), Some(TestRef::new("S", "SS", "T", "Test_2")));
        assert_eq!(state.language_code(), Some("hi"));

        let partial = QuizDialogueState::AwaitingUpload {
            path: vec!["S".into()],
            replacing: true,
            language_code: None,
        };
        assert_eq!(partial.upload_target(), None);
    }
}
