//! Filesystem-backed question catalog.
//!
//! Layout: `root/<Subject>/<SubSubject>/<Topic>/<Test>.csv`. The first three
//! levels are directories, the fourth is a CSV file whose stem is the test
//! name. Every segment is validated before it is joined onto the root.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use super::csv_reader::{read_questions_file, CsvIngest};
use super::record::QuestionRecord;
use crate::path_validation::{display_label, validate_segment, validate_segments};
use crate::quiz::{QuizError, QuizResult};

/// Depth of a full test reference (subject, sub-subject, topic, test)
pub const CATALOG_DEPTH: usize = 4;

const TEST_EXTENSION: &str = "csv";

static TRAILING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)$").expect("trailing number pattern is valid")
});

/// One level of the catalog hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogLevel {
    Subject,
    SubSubject,
    Topic,
    Test,
}

impl CatalogLevel {
    /// Level whose entries are listed under a parent path of `depth` segments
    pub fn from_depth(depth: usize) -> Option<Self> {
        match depth {
            0 => Some(CatalogLevel::Subject),
            1 => Some(CatalogLevel::SubSubject),
            2 => Some(CatalogLevel::Topic),
            3 => Some(CatalogLevel::Test),
            _ => None,
        }
    }
}

/// Fully qualified reference to one test file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestRef {
    pub subject: String,
    pub sub_subject: String,
    pub topic: String,
    pub test: String,
}

impl TestRef {
    pub fn new(
        subject: impl Into<String>,
        sub_subject: impl Into<String>,
        topic: impl Into<String>,
        test: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            sub_subject: sub_subject.into(),
            topic: topic.into(),
            test: test.into(),
        }
    }

    /// Build from a parent path of three segments plus the test name
    pub fn from_segments(segments: &[String]) -> Option<Self> {
        match segments {
            [subject, sub_subject, topic, test] => {
                Some(Self::new(subject, sub_subject, topic, test))
            }
            _ => None,
        }
    }

    pub fn segments(&self) -> [&str; CATALOG_DEPTH] {
        [&self.subject, &self.sub_subject, &self.topic, &self.test]
    }

    /// Human readable `Subject → Sub → Topic → Test`
    pub fn label(&self) -> String {
        self.segments()
            .iter()
            .map(|s| display_label(s))
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

/// Source of question lists for quiz launches
pub trait QuestionBank: Send + Sync {
    /// Load every valid question of a test in stored order.
    ///
    /// Fails with `NotFound` for an unknown test and `Format` for a file
    /// that is not a readable question CSV.
    fn load(&self, test: &TestRef) -> QuizResult<Vec<QuestionRecord>>;
}

/// Result of accepting an admin upload
#[derive(Debug, Clone)]
pub struct StoredTest {
    pub test: TestRef,
    pub path: PathBuf,
    pub question_count: usize,
    pub skipped_rows: usize,
}

/// Question bank stored as a directory tree of CSV files
#[derive(Debug, Clone)]
pub struct FsQuestionBank {
    root: PathBuf,
}

impl FsQuestionBank {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root directory if needed
    pub fn init(&self) -> QuizResult<()> {
        fs::create_dir_all(&self.root).map_err(|e| storage_error(&self.root, e))?;
        info!(root = %self.root.display(), "Question bank ready");
        Ok(())
    }

    fn dir_for<S: AsRef<str>>(&self, segments: &[S]) -> QuizResult<PathBuf> {
        validate_segments(segments)?;
        let mut path = self.root.clone();
        for segment in segments {
            path.push(segment.as_ref());
        }
        Ok(path)
    }

    /// Path of a test file, validated against traversal
    pub fn test_path(&self, test: &TestRef) -> QuizResult<PathBuf> {
        let mut path = self.dir_for(&test.segments())?;
        path.set_extension(TEST_EXTENSION);
        Ok(path)
    }

    /// Sorted entries below a parent path of 0..=3 segments.
    ///
    /// Directories are listed for the first three levels and CSV stems for
    /// the test level. A missing directory yields an empty list.
    pub fn list_level<S: AsRef<str>>(&self, parent: &[S]) -> QuizResult<Vec<String>> {
        let level = CatalogLevel::from_depth(parent.len()).ok_or_else(|| {
            QuizError::InvalidInput(format!("catalog depth {} has no children", parent.len()))
        })?;
        let dir = self.dir_for(parent)?;

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_error(&dir, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| storage_error(&dir, e))?;
            let path = entry.path();

            let name = if level == CatalogLevel::Test {
                let is_csv = path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(TEST_EXTENSION));
                if !path.is_file() || !is_csv {
                    continue;
                }
                path.file_stem().map(|s| s.to_string_lossy().into_owned())
            } else {
                if !path.is_dir() {
                    continue;
                }
                path.file_name().map(|s| s.to_string_lossy().into_owned())
            };

            match name {
                Some(name) if !name.starts_with('.') => names.push(name),
                _ => {}
            }
        }

        names.sort();
        Ok(names)
    }

    pub fn list_subjects(&self) -> QuizResult<Vec<String>> {
        self.list_level::<&str>(&[])
    }

    pub fn list_subsubjects(&self, subject: &str) -> QuizResult<Vec<String>> {
        self.list_level(&[subject])
    }

    pub fn list_topics(&self, subject: &str, sub_subject: &str) -> QuizResult<Vec<String>> {
        self.list_level(&[subject, sub_subject])
    }

    pub fn list_tests(
        &self,
        subject: &str,
        sub_subject: &str,
        topic: &str,
    ) -> QuizResult<Vec<String>> {
        self.list_level(&[subject, sub_subject, topic])
    }

    /// Create the directory chain for up to three segments
    pub fn ensure_path<S: AsRef<str>>(&self, segments: &[S]) -> QuizResult<PathBuf> {
        if segments.is_empty() || segments.len() >= CATALOG_DEPTH {
            return Err(QuizError::InvalidInput(format!(
                "directory path must have 1..{} segments",
                CATALOG_DEPTH
            )));
        }
        let dir = self.dir_for(segments)?;
        fs::create_dir_all(&dir).map_err(|e| storage_error(&dir, e))?;
        debug!(path = %dir.display(), "Catalog directory ensured");
        Ok(dir)
    }

    /// `Test_{n}` where n is one more than the largest trailing number in use
    pub fn next_test_name(
        &self,
        subject: &str,
        sub_subject: &str,
        topic: &str,
    ) -> QuizResult<String> {
        let next = self
            .list_tests(subject, sub_subject, topic)?
            .iter()
            .filter_map(|name| {
                TRAILING_NUMBER
                    .captures(name)
                    .and_then(|c| c[1].parse::<u64>().ok())
            })
            .max()
            .map_or(1, |n| n + 1);
        Ok(format!("Test_{}", next))
    }

    /// Validate an uploaded CSV and store it as `test`.
    ///
    /// The file must yield at least one valid question. It is written to a
    /// temporary file in the destination directory and renamed into place,
    /// so a failed upload never leaves a partial or invalid test behind.
    pub fn store_test(&self, test: &TestRef, source: &Path) -> QuizResult<StoredTest> {
        validate_segment(&test.test)?;
        let ingest: CsvIngest = read_questions_file(source)?;
        if ingest.records.is_empty() {
            return Err(QuizError::InvalidInput(format!(
                "no valid questions ({} rows rejected)",
                ingest.skipped.len()
            )));
        }

        let dir = self.ensure_path(&[&test.subject, &test.sub_subject, &test.topic])?;
        let dest = self.test_path(test)?;

        let bytes = fs::read(source).map_err(|e| storage_error(source, e))?;
        let mut staged =
            tempfile::NamedTempFile::new_in(&dir).map_err(|e| storage_error(&dir, e))?;
        staged
            .write_all(&bytes)
            .map_err(|e| storage_error(staged.path(), e))?;
        staged
            .persist(&dest)
            .map_err(|e| storage_error(&dest, e.error))?;

        info!(
            test = %test.label(),
            path = %dest.display(),
            questions = ingest.records.len(),
            skipped_rows = ingest.skipped.len(),
            "Stored question file"
        );

        Ok(StoredTest {
            test: test.clone(),
            path: dest,
            question_count: ingest.records.len(),
            skipped_rows: ingest.skipped.len(),
        })
    }
}

impl QuestionBank for FsQuestionBank {
    fn load(&self, test: &TestRef) -> QuizResult<Vec<QuestionRecord>> {
        let path = self.test_path(test)?;
        let ingest = read_questions_file(&path)?;
        if !ingest.skipped.is_empty() {
            warn!(
                test = %test.label(),
                skipped = ingest.skipped.len(),
                "Some stored questions were invalid and dropped"
            );
        }
        Ok(ingest.records)
    }
}

fn storage_error(path: &Path, err: std::io::Error) -> QuizError {
    QuizError::Storage(format!("{}: {}", path.display(), err))
}
