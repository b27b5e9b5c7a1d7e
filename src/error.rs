use thiserror::Error;

use crate::patterns::IdentifierKind;

#[derive(Debug, Error)]
pub enum TriageError {
    /// A configured column is not present in the input table.
    #[error("Missing field '{field}' in input (available: {})", .available.join(", "))]
    MissingField {
        field: String,
        available: Vec<String>,
    },

    #[error("Invalid pattern for {kind}: {source}")]
    InvalidPattern {
        kind: IdentifierKind,
        #[source]
        source: regex::Error,
    },

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TriageError>;
