//! `stack-client`: HTTP driver for the content management API.
//!
//! Implements [`migrate_core::StackClient`] with `reqwest`, so the engine
//! can run scripts against a real stack. The engine owns retries; this crate
//! makes one request per call and turns non-2xx responses into
//! [`migrate_core::ApiError`] values carrying the server's message.
//!
//! # Architecture
//!
//! ```text
//! TaskExecutor (migrate-core)
//!     │  dyn StackClient
//!     ▼
//! HttpStackClient   ← api_key / authorization / branch default headers
//!     │                one request per call, entries paged by 100
//!     ▼
//! types.rs          ← `{ "content_type": .. }` envelopes, error bodies
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use migrate_core::{ScriptRunner, StackSettings};
//! use std::sync::Arc;
//!
//! let settings = StackSettings::new("blt_key").with_management_token("cs_token");
//! let client = stack_client::connect(None, &settings)?;
//! let runner = ScriptRunner::new(Arc::new(client)).settings(settings);
//! ```

pub mod client;
pub mod error;
pub mod types;

#[cfg(test)]
mod tests;

pub use client::{HttpStackClient, DEFAULT_HOST, PAGE_SIZE};
pub use error::{Result, StackClientError};

use migrate_core::StackSettings;

/// Build a client for `host`, or the public API host when `None`.
pub fn connect(host: Option<&str>, settings: &StackSettings) -> Result<HttpStackClient> {
    HttpStackClient::new(host.unwrap_or(DEFAULT_HOST), settings)
}
