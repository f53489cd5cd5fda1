//! Error types for the ThreatSpec extractor.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for extraction, aggregation and output.
///
/// Every variant is fatal: the run either completes over all inputs or
/// aborts on the first failure. There is no retry anywhere.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("failed to create output file {path}: {source}")]
    OutputCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A grammar pattern declared a capture name with no corresponding
    /// record field. Raised at grammar construction, never while scanning
    /// input.
    #[error("pattern `{pattern}` captures `{capture}`, which is not a record field")]
    UnknownCapture {
        pattern: &'static str,
        capture: String,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
