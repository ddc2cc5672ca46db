//! Error types of the load → validate → aggregate pass.

use thiserror::Error;

/// The uploaded file could not be turned into a canonical table.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("unsupported file type '{0}' (expected .csv or a spreadsheet such as .xlsx)")]
    UnsupportedFormat(String),

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("the workbook contains no worksheet")]
    EmptySheet,

    #[error("the file has no header row")]
    NoHeader,

    #[error("missing required column 'date'")]
    MissingDateColumn,

    #[error("row {row}: cannot parse '{value}' as a date")]
    InvalidDate { row: usize, value: String },

    #[error("row {row}: cannot parse '{value}' as a non-negative number in column '{column}'")]
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },
}

/// A view was requested over a column the table does not have.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AggregationError {
    #[error("missing column '{0}'")]
    MissingColumn(&'static str),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}
