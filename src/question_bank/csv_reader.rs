//! CSV ingestion of question files.
//!
//! Expected header: `Question, Option A, Option B, Option C, Option D,
//! Answer, Description`. Column order is free and `Description` is optional.
//! Rows that fail [`QuestionRecord`] validation are skipped with a warning;
//! a missing required column fails the whole file.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, warn};

use super::record::{parse_answer_key, QuestionRecord};
use crate::quiz::{QuizError, QuizResult};

/// Columns a question file must provide
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "Question", "Option A", "Option B", "Option C", "Option D", "Answer",
];

/// Optional explanation column
pub const DESCRIPTION_COLUMN: &str = "Description";

/// A row that was dropped during ingestion
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    /// 1-based data row number (header excluded)
    pub row: usize,
    pub reason: String,
}

/// Outcome of reading one question file
#[derive(Debug, Clone, Default)]
pub struct CsvIngest {
    pub records: Vec<QuestionRecord>,
    pub skipped: Vec<SkippedRow>,
}

struct ColumnMap {
    question: usize,
    options: [usize; 4],
    answer: usize,
    description: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> QuizResult<Self> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let find = |name: &str| names.iter().position(|h| h.eq_ignore_ascii_case(name));

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| find(c).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(QuizError::Format(format!(
                "missing columns {:?}; found {:?}",
                missing, names
            )));
        }

        // All required columns were found above
        let col = |name: &str| find(name).unwrap_or_default();
        Ok(Self {
            question: col("Question"),
            options: [
                col("Option A"),
                col("Option B"),
                col("Option C"),
                col("Option D"),
            ],
            answer: col("Answer"),
            description: find(DESCRIPTION_COLUMN),
        })
    }

    fn record(&self, row: &StringRecord) -> QuizResult<QuestionRecord> {
        let field = |idx: usize| row.get(idx).unwrap_or("");

        let answer_raw = field(self.answer);
        let correct_index = parse_answer_key(answer_raw).ok_or_else(|| {
            QuizError::InvalidInput(format!("unrecognized answer '{}'", answer_raw))
        })?;

        QuestionRecord::new(
            field(self.question),
            self.options.map(field),
            correct_index,
            self.description.map(field).unwrap_or(""),
        )
    }
}

/// Parse question records from any CSV source
pub fn parse_questions<R: Read>(source: R) -> QuizResult<CsvIngest> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(source);

    let columns = ColumnMap::from_headers(reader.headers()?)?;
    let mut ingest = CsvIngest::default();

    for (i, result) in reader.records().enumerate() {
        let row_number = i + 1;
        let row = result?;

        if row.iter().all(|f| f.is_empty()) {
            continue;
        }

        match columns.record(&row) {
            Ok(record) => ingest.records.push(record),
            Err(e) => {
                warn!(row = row_number, error = %e, "Skipping invalid question row");
                ingest.skipped.push(SkippedRow {
                    row: row_number,
                    reason: e.to_string(),
                });
            }
        }
    }

    debug!(
        records = ingest.records.len(),
        skipped = ingest.skipped.len(),
        "Question file parsed"
    );
    Ok(ingest)
}

/// Read a question file from disk
pub fn read_questions_file(path: &Path) -> QuizResult<CsvIngest> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => QuizError::NotFound(path.display().to_string()),
        _ => QuizError::Format(format!("{}: {}", path.display(), e)),
    })?;
    parse_questions(file)
}
