//! # Localization Tests
//!
//! Message lookup, argument interpolation and language fallback for the
//! embedded English and Hindi catalogs.

use poll_quiz_bot::localization::{
    create_localization_manager, t_args_lang, t_lang, LocalizationManager,
};
use std::sync::Arc;

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_localization() -> Arc<LocalizationManager> {
        create_localization_manager().expect("Failed to create localization manager")
    }

    #[test]
    fn test_get_message_existing_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("start-message", "en", None);
        assert!(message.contains("/aiquiz"));
        assert!(message.contains("/addaicsv"));
    }

    #[test]
    fn test_get_message_nonexistent_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("nonexistent-key", "en", None);
        assert_eq!(message, "Missing translation: nonexistent-key");
    }

    #[test]
    fn test_unsupported_language_falls_back_to_english() {
        let manager = setup_localization();

        let fallback = manager.get_message_in_language("nav-back", "xx", None);
        let english = manager.get_message_in_language("nav-back", "en", None);
        assert_eq!(fallback, english);
    }

    #[test]
    fn test_hindi_differs_from_english() {
        let manager = setup_localization();

        let hindi = manager.get_message_in_language("start-message", "hi", None);
        let english = manager.get_message_in_language("start-message", "en", None);
        assert!(!hindi.is_empty());
        assert_ne!(hindi, english);
        // Commands are never translated
        assert!(hindi.contains("/aiquiz"));
    }

    #[test]
    fn test_score_interpolation_in_both_languages() {
        let manager = setup_localization();
        let args = [("correct", "3"), ("total", "7")];

        for lang in ["en", "hi"] {
            let message = manager.get_message_with_args_in_language("quiz-score", lang, &args);
            assert!(message.contains("3/7"), "{lang}: {message}");
        }
    }

    #[test]
    fn test_no_isolation_marks_in_output() {
        let manager = setup_localization();

        let message = t_args_lang(
            &manager,
            "admin-csv-saved",
            &[("path", "Biology/Cells/Mitosis/Test_1"), ("count", "12")],
            Some("en"),
        );
        assert!(message.contains("Biology/Cells/Mitosis/Test_1"));
        assert!(message.contains("12 questions"));
        assert!(!message.contains('\u{2068}'));
        assert!(!message.contains('\u{2069}'));
    }

    #[test]
    fn test_replacement_reply_differs_from_new_upload() {
        let manager = setup_localization();
        let args = [("path", "Biology/Cells/Mitosis/Test_1"), ("count", "8")];

        for lang in ["en", "hi"] {
            let saved = manager.get_message_with_args_in_language("admin-csv-saved", lang, &args);
            let replaced =
                manager.get_message_with_args_in_language("admin-csv-replaced", lang, &args);
            assert!(!replaced.starts_with("Missing translation"), "{lang}");
            assert!(replaced.contains("Biology/Cells/Mitosis/Test_1"));
            assert_ne!(saved, replaced);
        }
    }

    #[test]
    fn test_error_reply_keys_exist() {
        let manager = setup_localization();

        for key in ["error-generic", "error-network", "admins-only"] {
            for lang in ["en", "hi"] {
                let message = manager.get_message_in_language(key, lang, None);
                assert!(!message.starts_with("Missing translation"), "{key} {lang}");
            }
        }
    }

    #[test]
    fn test_language_detection() {
        let manager = setup_localization();

        assert_eq!(manager.detect_language(Some("en")), "en");
        assert_eq!(manager.detect_language(Some("en-US")), "en");
        assert_eq!(manager.detect_language(Some("hi")), "hi");
        assert_eq!(manager.detect_language(Some("hi_IN")), "hi");
        assert_eq!(manager.detect_language(None), "en");
        assert_eq!(manager.detect_language(Some("fr")), "en");
    }

    #[test]
    fn test_convenience_functions() {
        let manager = setup_localization();

        let message = t_lang(&manager, "cancelled", Some("hi-IN"));
        assert_eq!(message, manager.get_message_in_language("cancelled", "hi", None));

        let partial = t_args_lang(&manager, "quiz-partial-delivery", &[("skipped", "2")], None);
        assert!(partial.contains('2'));
    }

    #[test]
    fn test_supported_languages() {
        let manager = setup_localization();

        assert!(manager.is_language_supported("en"));
        assert!(manager.is_language_supported("hi"));
        assert!(!manager.is_language_supported("fr"));
    }
}
