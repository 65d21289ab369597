//! The handle a script declares its changes through.
//!
//! Each top-level declaration records its draft in the run's registry,
//! dispatches one action, and queues one task group. The task groups read the
//! drafts when they execute, so builder calls made after the declaration (new
//! fields, moves, option toggles) are all included.

use serde_json::{json, Map, Value};

use crate::action::{ActionKind, SourceLocation};
use crate::builder::ContentTypeBuilder;
use crate::entries::{derive_task, transform_task, DeriveLinkedEntries, TransformEntries};
use crate::error::{MigrationError, Result};
use crate::registry::{ContentTypeDraft, RunContext};
use crate::schema::{apply_moves, merge_edit_schema, MoveError};
use crate::task::{TaskContext, TaskGroup};
use crate::types::{ContentType, PendingKind};

/// Properties every created content type starts from; script options are
/// laid over them key by key.
fn create_defaults(id: &str) -> Map<String, Value> {
    let defaults = json!({
        "uid": id,
        "options": {
            "is_page": false,
            "singleton": false,
            "title": "title",
            "sub_title": []
        }
    });
    match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Script options as a map. Anything but an object declares no options.
fn options_map(options: Value) -> Map<String, Value> {
    match options {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            tracing::debug!(options = %other, "ignoring non-object options");
            Map::new()
        }
    }
}

fn invalid_moves(errors: Vec<MoveError>) -> MigrationError {
    MigrationError::InvalidMoves(errors.into_iter().flat_map(|e| e.messages).collect())
}

// ---------------------------------------------------------------------------
// Migration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Migration {
    run: RunContext,
}

impl Migration {
    pub fn new(run: RunContext) -> Self {
        Self { run }
    }

    pub fn run_context(&self) -> &RunContext {
        &self.run
    }

    /// Declare a new content type. Missing `title` / `description` are not
    /// an error here; validation reports them before anything executes.
    #[track_caller]
    pub fn create_content_type(&self, id: &str, options: Value) -> ContentTypeBuilder {
        let location = SourceLocation::caller();
        let options = options_map(options);

        self.run.with(|r| {
            let first = r.find_by_kind(id, PendingKind::Create).is_none();
            let draft = r.get_by_kind(id, PendingKind::Create);
            if first {
                *draft = ContentTypeDraft::with_properties(create_defaults(id));
            }
            draft.properties.extend(options.clone());

            r.dispatch(
                ActionKind::CreateContentType {
                    content_type: id.to_string(),
                    options,
                },
                location.clone(),
            );
            if first {
                r.push_task_group(create_task(id.to_string(), location));
            }
        });
        ContentTypeBuilder::new(self.run.clone(), id, PendingKind::Create)
    }

    /// Declare changes to an existing content type.
    ///
    /// When the same script already declared `id` with
    /// [`create_content_type`](Self::create_content_type), the create-time
    /// properties win over the ones given here for any key both name.
    #[track_caller]
    pub fn edit_content_type(&self, id: &str, options: Value) -> ContentTypeBuilder {
        let location = SourceLocation::caller();
        let options = options_map(options);

        self.run.with(|r| {
            let mut properties = Map::new();
            properties.insert("uid".into(), Value::String(id.to_string()));
            properties.extend(options.clone());
            if let Some(created) = r.find_by_kind(id, PendingKind::Create) {
                properties.extend(created.properties.clone());
            }

            let first = r.find_by_kind(id, PendingKind::Edit).is_none();
            r.get_by_kind(id, PendingKind::Edit)
                .properties
                .extend(properties);

            r.dispatch(
                ActionKind::EditContentType {
                    content_type: id.to_string(),
                    options,
                },
                location.clone(),
            );
            if first {
                r.push_task_group(edit_task(id.to_string(), location));
            }
        });
        ContentTypeBuilder::new(self.run.clone(), id, PendingKind::Edit)
    }

    /// Declare the removal of a content type. `force` starts out `false`.
    #[track_caller]
    pub fn delete_content_type(&self, id: &str) -> ContentTypeBuilder {
        let location = SourceLocation::caller();

        self.run.with(|r| {
            let first = r.find_by_kind(id, PendingKind::Delete).is_none();
            let draft = r.get_by_kind(id, PendingKind::Delete);
            draft
                .properties
                .insert("uid".into(), Value::String(id.to_string()));
            draft.properties.insert("force".into(), Value::Bool(false));

            r.dispatch(
                ActionKind::DeleteContentType {
                    content_type: id.to_string(),
                },
                location.clone(),
            );
            if first {
                r.push_task_group(delete_task(id.to_string(), location));
            }
        });
        ContentTypeBuilder::new(self.run.clone(), id, PendingKind::Delete)
    }

    /// Queue a script-defined task group after everything declared so far.
    #[track_caller]
    pub fn add_task(&self, group: TaskGroup) {
        let location = SourceLocation::caller();
        let group = match group.origin {
            Some(_) => group,
            None => group.origin(location.clone()),
        };
        self.run.with(|r| {
            r.dispatch(
                ActionKind::AddTask {
                    title: group.title.clone(),
                },
                location,
            );
            r.push_task_group(group);
        });
    }

    #[track_caller]
    pub fn transform_entries(&self, job: TransformEntries) {
        let location = SourceLocation::caller();
        self.run.with(|r| {
            r.dispatch(
                ActionKind::TransformEntries {
                    content_type: job.content_type.clone(),
                    from: job.from.clone(),
                    to: job.to.clone(),
                },
                location.clone(),
            );
            r.push_task_group(transform_task(job, location));
        });
    }

    #[track_caller]
    pub fn derive_linked_entries(&self, job: DeriveLinkedEntries) {
        let location = SourceLocation::caller();
        self.run.with(|r| {
            r.dispatch(
                ActionKind::DeriveLinkedEntries {
                    content_type: job.content_type.clone(),
                    derive_fields: job.derive_fields.clone(),
                    ref_content_type: job.ref_content_type.clone(),
                    ref_field: job.ref_field.clone(),
                },
                location.clone(),
            );
            r.push_task_group(derive_task(job, location));
        });
    }
}

// ---------------------------------------------------------------------------
// Task groups
// ---------------------------------------------------------------------------

fn create_task(id: String, origin: SourceLocation) -> TaskGroup {
    TaskGroup::new(format!("Creating content type '{id}'"))
        .success_title(format!("Created content type '{id}'"))
        .fail_title(format!("Failed to create content type '{id}'"))
        .origin(origin)
        .step("create content type", move |ctx| create_step(ctx, id))
}

async fn create_step(ctx: TaskContext, id: String) -> Result<()> {
    let body = ctx.run().with(|r| -> Result<ContentType> {
        let draft = r.require(&id, PendingKind::Create)?;
        create_body(draft)
    })?;
    ctx.create_content_type(&body).await?;
    Ok(())
}

fn edit_task(id: String, origin: SourceLocation) -> TaskGroup {
    let fetch_id = id.clone();
    TaskGroup::new(format!("Editing content type '{id}'"))
        .success_title(format!("Edited content type '{id}'"))
        .fail_title(format!("Failed to edit content type '{id}'"))
        .origin(origin)
        .step("fetch content type", move |ctx| fetch_step(ctx, fetch_id))
        .step("update content type", move |ctx| update_step(ctx, id))
}

/// Fetch the remote content type and keep it on the registry entry for the
/// update step.
async fn fetch_step(ctx: TaskContext, id: String) -> Result<()> {
    let existing = ctx.fetch_content_type(&id).await?;
    ctx.run().with(|r| r.get(&id).existing = Some(existing));
    Ok(())
}

async fn update_step(ctx: TaskContext, id: String) -> Result<()> {
    let body = ctx.run().with(|r| -> Result<ContentType> {
        let existing = r
            .peek(&id)
            .and_then(|e| e.existing.clone())
            .ok_or_else(|| MigrationError::Script(format!("content type '{id}' was not fetched")))?;
        let draft = r.require(&id, PendingKind::Edit)?;
        edit_body(existing, draft)
    })?;
    ctx.update_content_type(&body).await?;
    Ok(())
}

fn delete_task(id: String, origin: SourceLocation) -> TaskGroup {
    TaskGroup::new(format!("Deleting content type '{id}'"))
        .success_title(format!("Deleted content type '{id}'"))
        .fail_title(format!("Failed to delete content type '{id}'"))
        .origin(origin)
        .step("delete content type", move |ctx| delete_step(ctx, id))
}

async fn delete_step(ctx: TaskContext, id: String) -> Result<()> {
    let force = ctx.run().with(|r| {
        r.find_by_kind(&id, PendingKind::Delete)
            .map(ContentTypeDraft::force)
            .unwrap_or(false)
    });
    ctx.delete_content_type(&id, force).await?;
    Ok(())
}

/// The create request: the declared schema with its queued moves applied.
pub fn create_body(draft: &ContentTypeDraft) -> Result<ContentType> {
    let mut schema = draft.schema.clone();
    let errors = apply_moves(&mut schema, &draft.moves);
    if !errors.is_empty() {
        return Err(invalid_moves(errors));
    }
    ContentTypeDraft {
        schema,
        ..draft.clone()
    }
    .to_content_type()
}

/// The update request: the fetched content type with the declared
/// properties laid over it (`options` merged one level deep), and the
/// declared fields merged into its schema before the queued moves run.
pub fn edit_body(existing: ContentType, draft: &ContentTypeDraft) -> Result<ContentType> {
    let mut schema = merge_edit_schema(existing.schema.clone(), draft.schema.clone())?;
    let errors = apply_moves(&mut schema, &draft.moves);
    if !errors.is_empty() {
        return Err(invalid_moves(errors));
    }

    let mut body = match serde_json::to_value(&existing)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (key, value) in &draft.properties {
        match (key.as_str(), value) {
            ("force", _) => {}
            ("options", Value::Object(options)) => match body.get_mut("options") {
                Some(Value::Object(current)) => current.extend(options.clone()),
                _ => {
                    body.insert(key.clone(), value.clone());
                }
            },
            _ => {
                body.insert(key.clone(), value.clone());
            }
        }
    }
    body.insert("schema".into(), serde_json::to_value(&schema)?);
    Ok(serde_json::from_value(Value::Object(body))?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
