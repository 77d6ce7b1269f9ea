//! Path Validation module for the question bank hierarchy
//!
//! Every directory and file under the quiz root is addressed by a chain of
//! catalog segments (subject, sub-subject, topic, test). Segments typed by
//! admins are sanitized before they become directory names, and every
//! segment is validated before it is joined onto the quiz root so that a
//! crafted name can never escape it.
//!
//! ## Usage Examples
//!
//! ```rust
//! use poll_quiz_bot::path_validation::{sanitize_segment, validate_segment};
//!
//! assert_eq!(sanitize_segment("  Modern   History! "), "Modern_History");
//! assert!(validate_segment("Modern_History").is_ok());
//! assert!(validate_segment("../etc").is_err());
//! ```

use regex::Regex;
use std::sync::LazyLock;

/// Errors that can occur during segment validation
#[derive(Debug, Clone, PartialEq)]
pub enum PathValidationError {
    /// Segment is a traversal component (`.` or `..`)
    PathTraversal,
    /// Segment contains null bytes
    NullByte,
    /// Segment contains separators or characters outside the allowed set
    InvalidCharacters,
    /// Segment is too long
    SegmentTooLong,
    /// Segment uses a reserved name
    ReservedName,
    /// Empty segment provided
    EmptySegment,
}

/// Result type for path validation operations
pub type PathValidationResult<T> = Result<T, PathValidationError>;

/// Maximum allowed segment length in bytes
pub const MAX_SEGMENT_LENGTH: usize = 64;

/// Reserved names that should not be used (Windows compatibility)
pub const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+").expect("whitespace pattern is valid")
});

static DISALLOWED_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9 _\-]").expect("disallowed-character pattern is valid")
});

/// Turn a human label into a filesystem-safe catalog segment.
///
/// Anything outside `[A-Za-z0-9 _-]` is dropped and the remaining words are
/// joined with single underscores. The result may be
/// empty; callers must run [`validate_segment`] on it.
pub fn sanitize_segment(label: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(label, " ");
    let safe = DISALLOWED_CHARS.replace_all(&collapsed, "");
    let mut segment = safe.split_whitespace().collect::<Vec<_>>().join("_");

    if segment.len() > MAX_SEGMENT_LENGTH {
        // Only ASCII survives sanitizing, so byte truncation is a char boundary
        segment.truncate(MAX_SEGMENT_LENGTH);
    }

    segment
}

/// Validate a single catalog segment before it is joined onto the quiz root.
pub fn validate_segment(segment: &str) -> PathValidationResult<()> {
    if segment.is_empty() {
        return Err(PathValidationError::EmptySegment);
    }

    if segment.contains('\0') {
        return Err(PathValidationError::NullByte);
    }

    if segment == "." || segment == ".." {
        return Err(PathValidationError::PathTraversal);
    }

    if segment.len() > MAX_SEGMENT_LENGTH {
        return Err(PathValidationError::SegmentTooLong);
    }

    if segment
        .chars()
        .any(|c| !(c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == ' '))
    {
        return Err(PathValidationError::InvalidCharacters);
    }

    if RESERVED_NAMES.contains(&segment.to_uppercase().as_str()) {
        return Err(PathValidationError::ReservedName);
    }

    Ok(())
}

/// Validate every segment of a hierarchy path.
pub fn validate_segments<S: AsRef<str>>(segments: &[S]) -> PathValidationResult<()> {
    segments
        .iter()
        .try_for_each(|segment| validate_segment(segment.as_ref()))
}

/// Display form of a stored segment: underscores back to spaces.
pub fn display_label(segment: &str) -> String {
    segment.replace('_', " ")
}

impl std::fmt::Display for PathValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathValidationError::PathTraversal => {
                write!(f, "Name is a directory traversal component")
            }
            PathValidationError::NullByte => write!(f, "Name contains null bytes"),
            PathValidationError::InvalidCharacters => write!(f, "Name contains invalid characters"),
            PathValidationError::SegmentTooLong => write!(f, "Name is too long"),
            PathValidationError::ReservedName => write!(f, "Name is reserved"),
            PathValidationError::EmptySegment => write!(f, "Name is empty"),
        }
    }
}

impl std::error::Error for PathValidationError {}
