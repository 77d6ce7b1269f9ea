//! Callbacks module for handling all inline keyboard callback queries
//!
//! - `callback_handler`: main routing handler for all callback queries
//! - `navigation_callbacks`: catalog menus and quiz launch
//! - `admin_callbacks`: "Add new …" and replacement uploads
//! - `reveal_callbacks`: the owner-only "Show Answers" control

pub mod admin_callbacks;
pub mod callback_handler;
pub mod navigation_callbacks;
pub mod reveal_callbacks;

/// Text shown in the callback answer (a toast, or an alert when `alert`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackNotice {
    pub text: String,
    pub alert: bool,
}

impl CallbackNotice {
    pub fn toast(text: String) -> Self {
        Self { text, alert: false }
    }

    pub fn alert(text: String) -> Self {
        Self { text, alert: true }
    }
}
