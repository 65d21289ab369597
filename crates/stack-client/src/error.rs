use thiserror::Error;

/// Failures building an [`HttpStackClient`](crate::HttpStackClient).
///
/// Failures of individual calls are reported as
/// [`migrate_core::ApiError`] so the engine can retry and report them.
#[derive(Debug, Error)]
pub enum StackClientError {
    #[error("invalid value for header '{0}'")]
    InvalidHeader(&'static str),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, StackClientError>;
