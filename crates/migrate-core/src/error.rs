use thiserror::Error;

use crate::client::ApiError;

#[derive(Debug, Error)]
pub enum MigrationError {
    /// A chained builder method was called out of sequence.
    #[error("usage error: {0}")]
    Usage(String),

    #[error("{0} does not exist in the schema")]
    MissingSchemaField(String),

    #[error("invalid field moves: {}", .0.join("; "))]
    InvalidMoves(Vec<String>),

    #[error("content type '{0}' has no pending {1} declaration")]
    NoPendingChange(String, String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("script error: {0}")]
    Script(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MigrationError>;
