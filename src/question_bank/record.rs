//! The validated multiple-choice question shared by ingestion, dispatch and reveal.

use crate::quiz::{QuizError, QuizResult};

/// Number of options every question carries
pub const OPTION_COUNT: usize = 4;

/// Letters used to label options in prompts and reveals
pub const OPTION_LETTERS: [char; OPTION_COUNT] = ['A', 'B', 'C', 'D'];

/// An immutable multiple-choice question.
///
/// Fields are private so the only way to obtain a record is through
/// [`QuestionRecord::new`], which enforces the shape invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRecord {
    text: String,
    options: [String; OPTION_COUNT],
    correct_index: usize,
    explanation: String,
}

impl QuestionRecord {
    /// Build a record, trimming every field.
    ///
    /// Fails with [`QuizError::InvalidInput`] if the text or any option is
    /// blank or `correct_index` does not address one of the four options.
    pub fn new(
        text: impl AsRef<str>,
        options: [impl AsRef<str>; OPTION_COUNT],
        correct_index: usize,
        explanation: impl AsRef<str>,
    ) -> QuizResult<Self> {
        let text = text.as_ref().trim().to_string();
        if text.is_empty() {
            return Err(QuizError::InvalidInput("question text is empty".to_string()));
        }

        let options = options.map(|o| o.as_ref().trim().to_string());
        if let Some(pos) = options.iter().position(|o| o.is_empty()) {
            return Err(QuizError::InvalidInput(format!(
                "option {} is empty",
                OPTION_LETTERS[pos]
            )));
        }

        if correct_index >= OPTION_COUNT {
            return Err(QuizError::InvalidInput(format!(
                "correct index {} is outside 0..{}",
                correct_index, OPTION_COUNT
            )));
        }

        Ok(Self {
            text,
            options,
            correct_index,
            explanation: explanation.as_ref().trim().to_string(),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn options(&self) -> &[String; OPTION_COUNT] {
        &self.options
    }

    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    pub fn correct_letter(&self) -> char {
        OPTION_LETTERS[self.correct_index]
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// Exact single-choice match: the chosen set must be exactly `{correct_index}`.
    pub fn is_correct(&self, chosen: &[usize]) -> bool {
        chosen.len() == 1 && chosen[0] == self.correct_index
    }
}

/// Parse an answer cell: `A`-`D` or `1`-`4`, case-insensitive, with
/// surrounding brackets, dots and whitespace ignored.
pub fn parse_answer_key(raw: &str) -> Option<usize> {
    let cleaned = raw
        .trim()
        .trim_matches(|c: char| c == '(' || c == ')' || c == '.' || c == ':' || c.is_whitespace())
        .to_ascii_uppercase();

    match cleaned.as_str() {
        "A" | "1" => Some(0),
        "B" | "2" => Some(1),
        "C" | "3" => Some(2),
        "D" | "4" => Some(3),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(correct: usize) -> QuizResult<QuestionRecord> {
        QuestionRecord::new(
            " Capital of France? ",
            ["Paris", "Rome", "Berlin", "Madrid"],
            correct,
            "Paris has been the capital since 987.",
        )
    }

    #[test]
    fn test_new_trims_fields() {
        let q = record(0).unwrap();
        assert_eq!(q.text(), "Capital of France?");
        assert_eq!(q.options()[0], "Paris");
        assert_eq!(q.correct_letter(), 'A');
    }

    #[test]
    fn test_new_rejects_invalid_shapes() {
        assert!(record(4).is_err());
        assert!(QuestionRecord::new("  ", ["a", "b", "c", "d"], 0, "").is_err());
        let err = QuestionRecord::new("Q", ["a", "", "c", "d"], 0, "").unwrap_err();
        assert_eq!(err, QuizError::InvalidInput("option B is empty".to_string()));
    }

    #[test]
    fn test_is_correct_uses_exact_match() {
        let q = record(2).unwrap();
        assert!(q.is_correct(&[2]));
        assert!(!q.is_correct(&[1]));
        assert!(!q.is_correct(&[]));
        assert!(!q.is_correct(&[2, 3]));
    }

    #[test]
    fn test_parse_answer_key() {
        assert_eq!(parse_answer_key("a"), Some(0));
        assert_eq!(parse_answer_key(" (C) "), Some(2));
        assert_eq!(parse_answer_key("d."), Some(3));
        assert_eq!(parse_answer_key("2"), Some(1));
        assert_eq!(parse_answer_key("E"), None);
        assert_eq!(parse_answer_key("0"), None);
        assert_eq!(parse_answer_key(""), None);
    }
}
