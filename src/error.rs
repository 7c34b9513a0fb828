//! Error types for jellyfish chains.

use thiserror::Error;

/// Result type alias for jellyfish operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, saving, or exporting chains.
///
/// Maintenance operations (cleanup, prune, dedupe, trim, decay) cannot fail
/// once their inputs are validated and therefore do not return `Result`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("file too large: {bytes} bytes (limit {limit})")]
    FileTooLarge { bytes: usize, limit: usize },
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
