//! Bulk entry operations: in-place transforms and linked-entry derivation.
//!
//! Both walk every locale in fallback order, so an entry's fallback locale is
//! always processed before the locales that inherit from it.

use serde_json::json;
use std::fmt;
use std::sync::Arc;

use crate::action::SourceLocation;
use crate::error::{MigrationError, Result};
use crate::task::{TaskContext, TaskGroup};
use crate::types::{ContentType, Entry, Locale};

/// Mutates one entry; returns `true` when the entry should be written back.
pub type EntryTransform = Arc<dyn Fn(&mut Entry, &Locale) -> bool + Send + Sync>;

/// Builds the entry to create in the referenced content type, or `None` to
/// leave the source entry unlinked.
pub type EntryDeriver = Arc<dyn Fn(&Entry, &Locale) -> Option<Entry> + Send + Sync>;

// ---------------------------------------------------------------------------
// TransformEntries
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct TransformEntries {
    pub content_type: String,
    /// Fields the transform reads.
    pub from: Vec<String>,
    /// Fields the transform writes.
    pub to: Vec<String>,
    pub transform: EntryTransform,
}

impl TransformEntries {
    pub fn new<F>(content_type: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&mut Entry, &Locale) -> bool + Send + Sync + 'static,
    {
        Self {
            content_type: content_type.into(),
            from: Vec::new(),
            to: Vec::new(),
            transform: Arc::new(transform),
        }
    }

    pub fn from_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.from = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn to_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.to = fields.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Debug for TransformEntries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformEntries")
            .field("content_type", &self.content_type)
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// DeriveLinkedEntries
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct DeriveLinkedEntries {
    pub content_type: String,
    /// Source fields copied into the derived entry.
    pub derive_fields: Vec<String>,
    pub ref_content_type: String,
    /// Reference field on the source entry that receives the link.
    pub ref_field: String,
    pub derive_entry: EntryDeriver,
}

impl DeriveLinkedEntries {
    /// By default the derived entry is the source entry's `derive_fields`;
    /// entries carrying none of them are skipped.
    pub fn new<I, S>(
        content_type: impl Into<String>,
        derive_fields: I,
        ref_content_type: impl Into<String>,
        ref_field: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let derive_fields: Vec<String> = derive_fields.into_iter().map(Into::into).collect();
        let picked = derive_fields.clone();
        Self {
            content_type: content_type.into(),
            derive_fields,
            ref_content_type: ref_content_type.into(),
            ref_field: ref_field.into(),
            derive_entry: Arc::new(move |entry, _locale| pick_fields(entry, &picked)),
        }
    }

    pub fn derive_entry<F>(mut self, derive: F) -> Self
    where
        F: Fn(&Entry, &Locale) -> Option<Entry> + Send + Sync + 'static,
    {
        self.derive_entry = Arc::new(derive);
        self
    }
}

impl fmt::Debug for DeriveLinkedEntries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeriveLinkedEntries")
            .field("content_type", &self.content_type)
            .field("derive_fields", &self.derive_fields)
            .field("ref_content_type", &self.ref_content_type)
            .field("ref_field", &self.ref_field)
            .finish_non_exhaustive()
    }
}

fn pick_fields(entry: &Entry, fields: &[String]) -> Option<Entry> {
    let mut derived = Entry::default();
    for field in fields {
        if let Some(value) = entry.get(field) {
            derived.set(field.clone(), value.clone());
        }
    }
    if derived.0.is_empty() {
        None
    } else {
        Some(derived)
    }
}

fn require_fields<'a>(
    content_type: &ContentType,
    fields: impl IntoIterator<Item = &'a String>,
) -> Result<()> {
    for field in fields {
        if !content_type.has_field(field) {
            return Err(MigrationError::MissingSchemaField(field.clone()));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Task groups
// ---------------------------------------------------------------------------

pub(crate) fn transform_task(job: TransformEntries, origin: SourceLocation) -> TaskGroup {
    let ct = job.content_type.clone();
    TaskGroup::new(format!("Transforming entries of '{ct}'"))
        .success_title(format!("Transformed entries of '{ct}'"))
        .fail_title(format!("Failed to transform entries of '{ct}'"))
        .origin(origin)
        .step("transform entries", move |ctx| run_transform(ctx, job))
}

async fn run_transform(ctx: TaskContext, job: TransformEntries) -> Result<()> {
    let content_type = ctx.fetch_content_type(&job.content_type).await?;
    require_fields(&content_type, job.from.iter().chain(&job.to))?;

    for locale in ctx.ordered_locales().await? {
        let entries = ctx.fetch_entries(&content_type.uid, &locale.code).await?;
        let mut updated = 0usize;
        for mut entry in entries {
            if (job.transform)(&mut entry, &locale) {
                ctx.update_entry(&content_type.uid, &locale.code, &entry)
                    .await?;
                updated += 1;
            }
        }
        tracing::info!(
            content_type = %content_type.uid,
            locale = %locale.code,
            updated,
            "transformed entries"
        );
    }
    Ok(())
}

pub(crate) fn derive_task(job: DeriveLinkedEntries, origin: SourceLocation) -> TaskGroup {
    let ct = job.content_type.clone();
    let target = job.ref_content_type.clone();
    TaskGroup::new(format!("Deriving '{target}' entries from '{ct}'"))
        .success_title(format!("Derived '{target}' entries from '{ct}'"))
        .fail_title(format!("Failed to derive '{target}' entries from '{ct}'"))
        .origin(origin)
        .step("derive linked entries", move |ctx| run_derive(ctx, job))
}

async fn run_derive(ctx: TaskContext, job: DeriveLinkedEntries) -> Result<()> {
    let source = ctx.fetch_content_type(&job.content_type).await?;
    require_fields(
        &source,
        job.derive_fields.iter().chain(std::iter::once(&job.ref_field)),
    )?;
    let target = ctx.fetch_content_type(&job.ref_content_type).await?;

    for locale in ctx.ordered_locales().await? {
        let entries = ctx.fetch_entries(&source.uid, &locale.code).await?;
        let mut linked = 0usize;
        for mut entry in entries {
            let Some(derived) = (job.derive_entry)(&entry, &locale) else {
                continue;
            };
            let created = ctx.create_entry(&target.uid, &locale.code, &derived).await?;
            let uid = created
                .uid()
                .ok_or_else(|| {
                    MigrationError::Script(format!(
                        "entry created in '{}' has no uid",
                        target.uid
                    ))
                })?
                .to_string();
            entry.set(
                job.ref_field.clone(),
                json!([{ "uid": uid, "_content_type_uid": target.uid }]),
            );
            ctx.update_entry(&source.uid, &locale.code, &entry).await?;
            linked += 1;
        }
        tracing::info!(
            content_type = %source.uid,
            locale = %locale.code,
            linked,
            "derived linked entries"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStack;
    use crate::registry::RunContext;
    use crate::task::{TaskExecutor, TaskStatus};
    use crate::types::FieldDescriptor;
    use serde_json::{Map, Value};
    use std::sync::Mutex;

    fn entry(value: Value) -> Entry {
        serde_json::from_value(value).unwrap()
    }

    fn content_type(uid: &str, fields: &[&str]) -> ContentType {
        ContentType {
            uid: uid.into(),
            title: uid.into(),
            description: None,
            options: Map::new(),
            schema: fields.iter().map(|f| FieldDescriptor::named(f)).collect(),
            extra: Map::new(),
        }
    }

    fn executor(stack: Arc<InMemoryStack>) -> TaskExecutor {
        TaskExecutor::new(TaskContext::new(stack, RunContext::new()))
    }

    #[tokio::test]
    async fn transform_visits_locales_in_fallback_order() {
        let stack = Arc::new(
            InMemoryStack::new()
                .with_content_type(content_type("blog", &["title", "slug"]))
                .with_locale(Locale::with_fallback("fr-fr", "en-us"))
                .with_locale(Locale::new("en-us"))
                .with_entries(
                    "blog",
                    "en-us",
                    vec![entry(json!({"uid": "e1", "title": "Hello World"}))],
                )
                .with_entries(
                    "blog",
                    "fr-fr",
                    vec![entry(json!({"uid": "e2", "title": "Bonjour"}))],
                ),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let job = TransformEntries::new("blog", move |entry, locale| {
            log.lock().unwrap().push(locale.code.clone());
            let slug = entry
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_lowercase()
                .replace(' ', "-");
            entry.set("slug", Value::String(slug));
            true
        })
        .from_fields(["title"])
        .to_fields(["slug"]);

        let report = executor(stack.clone())
            .run(vec![transform_task(job, SourceLocation::new("m.rs", 1))])
            .await;
        assert!(report.succeeded());
        assert_eq!(*seen.lock().unwrap(), vec!["en-us", "fr-fr"]);
        assert_eq!(stack.entries("blog", "en-us")[0].get("slug"), Some(&json!("hello-world")));
        assert_eq!(stack.call_count("update_entry"), 2);
    }

    #[tokio::test]
    async fn transform_returning_false_skips_update() {
        let stack = Arc::new(
            InMemoryStack::new()
                .with_content_type(content_type("blog", &["title"]))
                .with_locale(Locale::new("en-us"))
                .with_entries("blog", "en-us", vec![entry(json!({"uid": "e1"}))]),
        );
        let job = TransformEntries::new("blog", |_, _| false)
            .from_fields(["title"])
            .to_fields(["title"]);
        let report = executor(stack.clone())
            .run(vec![transform_task(job, SourceLocation::new("m.rs", 1))])
            .await;
        assert!(report.succeeded());
        assert_eq!(stack.call_count("update_entry"), 0);
    }

    #[tokio::test]
    async fn transform_fails_on_unknown_field() {
        let stack = Arc::new(
            InMemoryStack::new()
                .with_content_type(content_type("blog", &["title"]))
                .with_locale(Locale::new("en-us")),
        );
        let job = TransformEntries::new("blog", |_, _| true)
            .from_fields(["title"])
            .to_fields(["summary"]);
        let report = executor(stack.clone())
            .run(vec![transform_task(job, SourceLocation::new("m.rs", 1))])
            .await;
        let failure = report.failure.unwrap();
        assert_eq!(failure.error.to_string(), "summary does not exist in the schema");
        assert_eq!(
            report.outcomes[0].status,
            TaskStatus::Failed {
                reason: "summary does not exist in the schema".into()
            }
        );
        assert_eq!(stack.call_count("fetch_locales"), 0);
    }

    #[tokio::test]
    async fn derive_creates_and_links() {
        let stack = Arc::new(
            InMemoryStack::new()
                .with_content_type(content_type("blog", &["author_name", "author"]))
                .with_content_type(content_type("author", &["author_name"]))
                .with_locale(Locale::new("en-us"))
                .with_entries(
                    "blog",
                    "en-us",
                    vec![
                        entry(json!({"uid": "p1", "author_name": "Ada"})),
                        entry(json!({"uid": "p2"})),
                    ],
                ),
        );
        let job = DeriveLinkedEntries::new("blog", ["author_name"], "author", "author");
        let report = executor(stack.clone())
            .run(vec![derive_task(job, SourceLocation::new("m.rs", 1))])
            .await;
        assert!(report.succeeded());

        let authors = stack.entries("author", "en-us");
        assert_eq!(authors.len(), 1);
        assert_eq!(authors[0].get("author_name"), Some(&json!("Ada")));

        let posts = stack.entries("blog", "en-us");
        let link = posts[0].get("author").unwrap();
        assert_eq!(link[0]["uid"], json!(authors[0].uid().unwrap()));
        assert_eq!(link[0]["_content_type_uid"], "author");
        assert!(posts[1].get("author").is_none());
    }

    #[test]
    fn debug_omits_closures() {
        let job = TransformEntries::new("blog", |_, _| true);
        assert!(format!("{job:?}").starts_with("TransformEntries { content_type: \"blog\""));
    }
}
