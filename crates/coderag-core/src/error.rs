use coderag_index::IndexError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A query arrived before any ingest succeeded.
    #[error("Index not built; please ingest a repository first.")]
    IndexNotReady,

    #[error(transparent)]
    Index(IndexError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<IndexError> for CoreError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::NotBuilt => Self::IndexNotReady,
            other => Self::Index(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
