//! Question bank: validated records, CSV ingestion and the on-disk catalog.

pub mod catalog;
pub mod csv_reader;
pub mod record;

pub use catalog::{CatalogLevel, FsQuestionBank, QuestionBank, StoredTest, TestRef, CATALOG_DEPTH};
pub use csv_reader::{parse_questions, read_questions_file, CsvIngest, SkippedRow};
pub use record::{parse_answer_key, QuestionRecord, OPTION_COUNT, OPTION_LETTERS};
