//! The remote-service boundary.
//!
//! The engine never talks to the network directly: every remote call goes
//! through an injected [`StackClient`]. `stack-client` provides the HTTP
//! implementation; [`InMemoryStack`](crate::memory::InMemoryStack) backs tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ContentType, Entry, Locale};

/// A failed remote call, carrying the server-provided message verbatim.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApiError {
    /// HTTP status, when the failure came from a response rather than the
    /// transport.
    pub status: Option<u16>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Per-field error details as returned by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            code: None,
            errors: None,
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            ..Self::new(message)
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Operations the engine needs from the content management service.
///
/// All methods are treated as retryable by the task layer.
#[async_trait]
pub trait StackClient: Send + Sync {
    // ── Content types ──

    async fn fetch_content_type(&self, uid: &str) -> ApiResult<ContentType>;
    async fn create_content_type(&self, content_type: &ContentType) -> ApiResult<ContentType>;
    async fn update_content_type(&self, content_type: &ContentType) -> ApiResult<ContentType>;
    async fn delete_content_type(&self, uid: &str, force: bool) -> ApiResult<()>;

    // ── Locales ──

    async fn fetch_locales(&self) -> ApiResult<Vec<Locale>>;

    // ── Entries ──

    /// Every entry of `content_type` in `locale`; implementations page
    /// through the full result set.
    async fn fetch_entries(&self, content_type: &str, locale: &str) -> ApiResult<Vec<Entry>>;
    async fn create_entry(&self, content_type: &str, locale: &str, entry: &Entry)
        -> ApiResult<Entry>;
    async fn update_entry(&self, content_type: &str, locale: &str, entry: &Entry)
        -> ApiResult<Entry>;
}
