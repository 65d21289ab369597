//! Request and response envelopes of the content management API.
//!
//! Every resource travels wrapped in a single-key object named after it:
//! `{ "content_type": { .. } }`, `{ "entries": [ .. ] }` and so on.

use migrate_core::{ApiError, ContentType, Entry, Locale};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── Content types ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ContentTypeEnvelope {
    pub content_type: ContentType,
}

#[derive(Debug, Serialize)]
pub struct ContentTypeBody<'a> {
    pub content_type: &'a ContentType,
}

// ─── Locales ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LocalesEnvelope {
    pub locales: Vec<Locale>,
}

// ─── Entries ──────────────────────────────────────────────────────────────

/// One page of entries. `count` is present when `include_count=true` was
/// requested.
#[derive(Debug, Deserialize)]
pub struct EntriesPage {
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct EntryEnvelope {
    pub entry: Entry,
}

#[derive(Debug, Serialize)]
pub struct EntryBody<'a> {
    pub entry: &'a Entry,
}

// ─── Errors ───────────────────────────────────────────────────────────────

/// Body of a non-2xx response.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub errors: Option<Value>,
}

impl ErrorBody {
    /// Build the engine-facing error, falling back to the raw body (or the
    /// status line) when the server sent no `error_message`.
    pub fn into_api_error(self, status: u16, raw: &str) -> ApiError {
        let message = match self.error_message {
            Some(message) => message,
            None if !raw.trim().is_empty() => raw.trim().to_string(),
            None => format!("request failed with status {status}"),
        };
        ApiError {
            status: Some(status),
            message,
            code: self.error_code,
            errors: self.errors,
        }
    }
}
