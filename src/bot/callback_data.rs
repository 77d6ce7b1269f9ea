//! Inline keyboard payloads.
//!
//! Telegram limits callback data to 64 bytes, so catalog positions are
//! encoded as index paths into the sorted listing (`u:0.2.1`) instead of
//! names. Indices are resolved against the catalog when the button is
//! pressed.

use std::fmt;

use crate::question_bank::{FsQuestionBank, CATALOG_DEPTH};
use crate::quiz::{QuizResult, SessionId};

/// Telegram's callback data limit in bytes
pub const CALLBACK_DATA_LIMIT: usize = 64;

/// Which menu a navigation button belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuMode {
    /// `/aiquiz`: picking a test launches it
    User,
    /// `/addaicsv`: picking a test asks for a replacement upload
    Admin,
}

impl MenuMode {
    fn prefix(self) -> &'static str {
        match self {
            MenuMode::User => "u",
            MenuMode::Admin => "a",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Show the entries below `path`, or pick the test when `path` is full
    Navigate { mode: MenuMode, path: Vec<usize> },
    /// Admin "Add new …" under `path`
    AddEntry { path: Vec<usize> },
    /// "Show Answers" on a score message
    Reveal { session_id: SessionId, owner_id: u64 },
}

impl CallbackAction {
    /// Parse callback data; `None` for anything this bot did not produce
    pub fn parse(data: &str) -> Option<Self> {
        let (tag, rest) = data.split_once(':')?;
        match tag {
            "u" => Some(CallbackAction::Navigate {
                mode: MenuMode::User,
                path: parse_path(rest)?,
            }),
            "a" => Some(CallbackAction::Navigate {
                mode: MenuMode::Admin,
                path: parse_path(rest)?,
            }),
            "n" => {
                let path = parse_path(rest)?;
                (path.len() < CATALOG_DEPTH).then_some(CallbackAction::AddEntry { path })
            }
            "r" => {
                let (session, owner) = rest.split_once(':')?;
                Some(CallbackAction::Reveal {
                    session_id: session.parse().ok()?,
                    owner_id: owner.parse().ok()?,
                })
            }
            _ => None,
        }
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::Navigate { mode, path } => {
                write!(f, "{}:{}", mode.prefix(), join_path(path))
            }
            CallbackAction::AddEntry { path } => write!(f, "n:{}", join_path(path)),
            CallbackAction::Reveal {
                session_id,
                owner_id,
            } => write!(f, "r:{}:{}", session_id, owner_id),
        }
    }
}

fn join_path(path: &[usize]) -> String {
    path.iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

fn parse_path(raw: &str) -> Option<Vec<usize>> {
    if raw.is_empty() {
        return Some(Vec::new());
    }
    let path = raw
        .split('.')
        .map(|part| part.parse::<usize>().ok())
        .collect::<Option<Vec<_>>>()?;
    (path.len() <= CATALOG_DEPTH).then_some(path)
}

/// Map an index path to catalog names.
///
/// `None` when an index no longer exists, i.e. the menu is stale.
pub fn resolve_path(bank: &FsQuestionBank, path: &[usize]) -> QuizResult<Option<Vec<String>>> {
    let mut names: Vec<String> = Vec::with_capacity(path.len());
    for &index in path {
        let entries = bank.list_level(&names)?;
        match entries.into_iter().nth(index) {
            Some(name) => names.push(name),
            None => return Ok(None),
        }
    }
    Ok(Some(names))
}

/// Inverse of [`resolve_path`]: index path of existing catalog names
pub fn locate_path(bank: &FsQuestionBank, names: &[String]) -> QuizResult<Option<Vec<usize>>> {
    let mut path = Vec::with_capacity(names.len());
    for depth in 0..names.len() {
        let entries = bank.list_level(&names[..depth])?;
        match entries.iter().position(|entry| *entry == names[depth]) {
            Some(index) => path.push(index),
            None => return Ok(None),
        }
    }
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_and_format() {
        let cases = [
            "u:",
            "u:0.2.1",
            "a:3",
            "n:0.1",
            "r:17:123456789",
        ];
        for data in cases {
            let action = CallbackAction::parse(data).unwrap();
            assert_eq!(action.to_string(), data);
        }
    }

    #[test]
    fn test_rejects_foreign_data() {
        assert_eq!(CallbackAction::parse("edit_3"), None);
        assert_eq!(CallbackAction::parse("u:0.x"), None);
        assert_eq!(CallbackAction::parse("u:0.1.2.3.4"), None);
        assert_eq!(CallbackAction::parse("n:0.1.2.3"), None);
        assert_eq!(CallbackAction::parse("r:5"), None);
    }

    #[test]
    fn test_longest_payload_fits() {
        let reveal = CallbackAction::Reveal {
            session_id: u64::MAX,
            owner_id: u64::MAX,
        };
        assert!(reveal.to_string().len() <= CALLBACK_DATA_LIMIT);

        let nav = CallbackAction::Navigate {
            mode: MenuMode::Admin,
            path: vec![9999; CATALOG_DEPTH],
        };
        assert!(nav.to_string().len() <= CALLBACK_DATA_LIMIT);
    }

    #[test]
    fn test_resolve_path() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("Biology/Cells/Mitosis")).unwrap();
        fs::create_dir_all(dir.path().join("History")).unwrap();
        fs::write(dir.path().join("Biology/Cells/Mitosis/Test_1.csv"), "x").unwrap();
        let bank = FsQuestionBank::new(dir.path());

        assert_eq!(
            resolve_path(&bank, &[0, 0, 0, 0]).unwrap(),
            Some(vec![
                "Biology".to_string(),
                "Cells".to_string(),
                "Mitosis".to_string(),
                "Test_1".to_string()
            ])
        );
        assert_eq!(resolve_path(&bank, &[1]).unwrap(), Some(vec!["History".to_string()]));
        assert_eq!(resolve_path(&bank, &[2]).unwrap(), None);
        assert_eq!(resolve_path(&bank, &[]).unwrap(), Some(Vec::new()));

        let names = vec!["History".to_string()];
        assert_eq!(locate_path(&bank, &names).unwrap(), Some(vec![1]));
        assert_eq!(locate_path(&bank, &["Physics".to_string()]).unwrap(), None);
    }
}
