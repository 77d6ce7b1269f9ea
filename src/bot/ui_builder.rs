//! UI Builder module for creating keyboards and menu texts

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::html;

use super::callback_data::{CallbackAction, MenuMode};
use crate::localization::{t_args_lang, t_lang, LocalizationManager};
use crate::path_validation::display_label;
use crate::question_bank::CatalogLevel;
use crate::quiz::RevealControl;

/// Telegram truncates long button captions badly; keep them readable
const BUTTON_LABEL_LIMIT: usize = 40;

/// Keyboard for one catalog level.
///
/// One button per entry (index path `path + [i]`), then the admin "Add new"
/// button, then Back when not at the root.
pub fn level_keyboard(
    entries: &[String],
    path: &[usize],
    mode: MenuMode,
    localization: &LocalizationManager,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let mut child = path.to_vec();
            child.push(i);
            vec![InlineKeyboardButton::callback(
                button_label(entry),
                CallbackAction::Navigate { mode, path: child }.to_string(),
            )]
        })
        .collect();

    if mode == MenuMode::Admin {
        if let Some(level) = CatalogLevel::from_depth(path.len()) {
            rows.push(vec![InlineKeyboardButton::callback(
                t_lang(localization, add_label_key(level), language_code),
                CallbackAction::AddEntry {
                    path: path.to_vec(),
                }
                .to_string(),
            )]);
        }
    }

    if let Some((_, parent)) = path.split_last() {
        rows.push(vec![InlineKeyboardButton::callback(
            t_lang(localization, "nav-back", language_code),
            CallbackAction::Navigate {
                mode,
                path: parent.to_vec(),
            }
            .to_string(),
        )]);
    }

    InlineKeyboardMarkup::new(rows)
}

/// Heading above a level keyboard, e.g. "📂 Biology → Cells / Choose a topic:"
pub fn level_prompt(
    names: &[String],
    mode: MenuMode,
    entries_empty: bool,
    localization: &LocalizationManager,
    language_code: Option<&str>,
) -> String {
    let Some(level) = CatalogLevel::from_depth(names.len()) else {
        return t_lang(localization, "nav-expired", language_code);
    };

    let key = match (mode, level) {
        (MenuMode::User, CatalogLevel::Subject) => "nav-choose-subject",
        (MenuMode::User, CatalogLevel::SubSubject) => "nav-choose-subsubject",
        (MenuMode::User, CatalogLevel::Topic) => "nav-choose-topic",
        (MenuMode::User, CatalogLevel::Test) => "nav-choose-test",
        (MenuMode::Admin, CatalogLevel::Subject) => "admin-choose-subject",
        (MenuMode::Admin, CatalogLevel::SubSubject) => "admin-choose-subsubject",
        (MenuMode::Admin, CatalogLevel::Topic) => "admin-choose-topic",
        (MenuMode::Admin, CatalogLevel::Test) => "admin-choose-test",
    };

    let mut text = t_args_lang(
        localization,
        key,
        &[("path", &html::escape(&path_label(names)))],
        language_code,
    );

    if entries_empty && mode == MenuMode::User {
        text.push_str("\n\n");
        text.push_str(&t_lang(localization, "nav-empty", language_code));
    }
    text
}

/// Single "Show Answers" button tagged with the session and its owner
pub fn reveal_keyboard(control: &RevealControl) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        control.label.clone(),
        CallbackAction::Reveal {
            session_id: control.session_id,
            owner_id: control.owner_id,
        }
        .to_string(),
    )]])
}

/// Localization key of the admin "Add new …" button for a level
pub fn add_label_key(level: CatalogLevel) -> &'static str {
    match level {
        CatalogLevel::Subject => "admin-add-subject",
        CatalogLevel::SubSubject => "admin-add-subsubject",
        CatalogLevel::Topic => "admin-add-topic",
        CatalogLevel::Test => "admin-add-test",
    }
}

/// Localization key asking for the name of a new entry at `level`
pub fn ask_name_key(level: CatalogLevel) -> Option<&'static str> {
    match level {
        CatalogLevel::Subject => Some("admin-ask-subject-name"),
        CatalogLevel::SubSubject => Some("admin-ask-subsubject-name"),
        CatalogLevel::Topic => Some("admin-ask-topic-name"),
        CatalogLevel::Test => None,
    }
}

/// `Subject → Sub → Topic` with underscores shown as spaces
pub fn path_label(names: &[String]) -> String {
    names
        .iter()
        .map(|n| display_label(n))
        .collect::<Vec<_>>()
        .join(" → ")
}

fn button_label(entry: &str) -> String {
    crate::quiz::truncate_chars(&display_label(entry), BUTTON_LABEL_LIMIT)
}
