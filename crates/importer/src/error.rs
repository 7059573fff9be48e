use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to read {}: {source}", .file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV in {}: {source}", .file.display())]
    Csv {
        file: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Invalid {column} '{value}' in {file}, line {line}")]
    InvalidValue {
        file: String,
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] database::DbError),
}
