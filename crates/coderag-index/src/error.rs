//! Error types for coderag-index.

use std::num::TryFromIntError;
use std::path::PathBuf;

/// Errors that can occur while building or querying the index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// IO error reading sources or index artifacts.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The ingestion root cannot be read at all.
    #[error("cannot read source tree {}: {source}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Tree-sitter parsing error.
    #[error("parse failed: {0}")]
    Parse(String),

    /// Unsupported or unrecognized language.
    #[error("unsupported language")]
    UnsupportedLanguage,

    /// No index has been persisted yet.
    #[error("index not built")]
    NotBuilt,

    /// Vector index and metadata on disk do not describe the same build.
    #[error("index artifacts are inconsistent: {0}")]
    Inconsistent(String),

    /// An artifact exists but cannot be decoded.
    #[error("index artifact is corrupt: {0}")]
    Corrupt(String),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Integer conversion error.
    #[error("integer conversion failed: {0}")]
    IntConversion(#[from] TryFromIntError),

    /// A blocking worker task failed to complete.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Generic catch-all error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
