//! `migrate-core`: the content-type migration engine.
//!
//! Scripts describe structural changes (create, edit and delete content
//! types and their fields, reorder fields, bulk-transform entries) through a
//! fluent builder API. Nothing touches the remote stack until every builder
//! call has been validated.
//!
//! # Architecture
//!
//! ```text
//! MigrationScript
//!     │  builder calls
//!     ▼
//! Migration / ContentTypeBuilder / FieldBuilder
//!     │  drafts + actions + task groups
//!     ▼
//! RunContext (Registry)   ← one per script run
//!     │
//!     ├─► ValidatorChain  ← actions → Diagnostics; any error stops here
//!     │
//!     ▼
//! TaskExecutor            ← task groups in order, leaf calls retried
//!     │
//!     ▼
//! dyn StackClient         ← HTTP in `stack-client`, InMemoryStack in tests
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use migrate_core::{script, ScriptParams, ScriptRunner};
//! use serde_json::json;
//!
//! async fn create_blog(p: ScriptParams) -> anyhow::Result<()> {
//!     let blog = p.migration.create_content_type(
//!         "blog",
//!         json!({ "title": "Blog", "description": "Posts" }),
//!     );
//!     blog.create_field("Title").data_type("text").mandatory(true);
//!     blog.create_field("Body").data_type("text");
//!     blog.move_field("Body").after_field("Title")?;
//!     Ok(())
//! }
//!
//! let report = ScriptRunner::new(client).run(&script("create_blog", create_blog)).await;
//! ```

pub mod action;
pub mod builder;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod entries;
pub mod error;
pub mod field;
pub mod locale;
pub mod memory;
pub mod migration;
pub mod registry;
pub mod retry;
pub mod runner;
pub mod schema;
pub mod task;
pub mod types;
pub mod validator;

pub use builder::{ContentTypeBuilder, SchemaOptionsSetter};
pub use client::{ApiError, ApiResult, StackClient};
pub use config::{ScriptConfig, StackSettings};
pub use diagnostics::{Diagnostic, ErrorKind};
pub use entries::{DeriveLinkedEntries, TransformEntries};
pub use error::{MigrationError, Result};
pub use field::{FieldBuilder, FieldOptions};
pub use migration::Migration;
pub use runner::{
    script, FnScript, MigrationScript, RunnerOptions, ScriptParams, ScriptReport, ScriptRunner,
    ScriptStatus,
};
pub use task::{TaskContext, TaskGroup, TaskOutcome, TaskStatus};
pub use types::{ContentType, Entry, FieldDescriptor, Locale};
