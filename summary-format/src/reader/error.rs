use std::io;

#[cfg(doc)]
use super::read_table;

/// The errors that can be encountered when reading summary files with [`read_table`] and
/// friends.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("failed to read from source: {0}")]
    IoError(#[from] io::Error),

    #[error("source is not valid UTF-8")]
    InvalidUtf8,

    #[error("failed to parse line {line_nr}: {reason}")]
    ParseError { line_nr: usize, reason: String },

    #[error("the source does not contain a header")]
    MissingHeader,

    #[error("line {line_nr} has {actual} fields, but the header has {expected}")]
    FieldCount {
        line_nr: usize,
        expected: usize,
        actual: usize,
    },

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: cannot interpret '{value}' in column '{column}' as {expected}")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
        expected: &'static str,
    },
}
