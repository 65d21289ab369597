//! Content-type builder returned by `create_content_type` / `edit_content_type`.
//!
//! Every call mutates the draft for `(id, kind)` in the run's registry and
//! dispatches one action at the caller's source location. Nothing here talks
//! to the remote service; the task groups queued by
//! [`Migration`](crate::migration::Migration) read the drafts when they run.

use serde_json::{Map, Value};

use crate::action::{ActionKind, SourceLocation};
use crate::error::{MigrationError, Result};
use crate::field::{FieldBuilder, FieldOptions};
use crate::registry::{ContentTypeDraft, RunContext};
use crate::schema::{MoveFieldAction, MoveOperation};
use crate::types::{field_uid, FieldDescriptor, PendingKind};

// ---------------------------------------------------------------------------
// SchemaOptionsSetter
// ---------------------------------------------------------------------------

/// Content-type level option toggles, available from both the create and the
/// edit path.
pub trait SchemaOptionsSetter {
    /// Set one key of the content type's `options` object.
    fn set_schema_option(&self, key: &str, value: Value);

    fn singleton(&self, value: bool) -> &Self {
        self.set_schema_option("singleton", Value::Bool(value));
        self
    }

    fn is_page(&self, value: bool) -> &Self {
        self.set_schema_option("is_page", Value::Bool(value));
        self
    }
}

// ---------------------------------------------------------------------------
// ContentTypeBuilder
// ---------------------------------------------------------------------------

/// Builder bound to one content-type id and one pending kind.
#[derive(Debug, Clone)]
pub struct ContentTypeBuilder {
    run: RunContext,
    id: String,
    kind: PendingKind,
}

impl ContentTypeBuilder {
    pub(crate) fn new(run: RunContext, id: impl Into<String>, kind: PendingKind) -> Self {
        Self {
            run,
            id: id.into(),
            kind,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> PendingKind {
        self.kind
    }

    pub(crate) fn run(&self) -> &RunContext {
        &self.run
    }

    /// Mutate this builder's draft under the registry lock.
    pub(crate) fn with_draft<R>(&self, f: impl FnOnce(&mut ContentTypeDraft) -> R) -> R {
        self.run.with(|r| f(r.get_by_kind(&self.id, self.kind)))
    }

    fn set_property(&self, key: &str, value: Value) -> &Self {
        self.with_draft(|d| {
            d.properties.insert(key.to_string(), value);
        });
        self
    }

    pub fn title(&self, title: impl Into<String>) -> &Self {
        self.set_property("title", Value::String(title.into()))
    }

    pub fn description(&self, description: impl Into<String>) -> &Self {
        self.set_property("description", Value::String(description.into()))
    }

    pub fn force(&self, force: bool) -> &Self {
        self.set_property("force", Value::Bool(force))
    }

    // ── Fields ──

    /// Put `field` in the draft schema and dispatch `action`. A field whose
    /// uid is already declared is replaced where it stands, keeping uids
    /// unique within the schema.
    fn declare_field(
        &self,
        field: FieldDescriptor,
        action: ActionKind,
        location: SourceLocation,
    ) -> usize {
        self.run.with(|r| {
            let schema = &mut r.get_by_kind(&self.id, self.kind).schema;
            let index = match schema.iter().position(|f| f.uid == field.uid) {
                Some(i) => {
                    schema[i] = field;
                    i
                }
                None => {
                    schema.push(field);
                    schema.len() - 1
                }
            };
            r.dispatch(action, location);
            index
        })
    }

    #[track_caller]
    pub fn create_field(&self, name: &str) -> FieldBuilder {
        let location = SourceLocation::caller();
        let field = FieldDescriptor::named(name);
        let action = ActionKind::CreateField {
            content_type: self.id.clone(),
            kind: self.kind,
            field: field.uid.clone(),
        };
        let index = self.declare_field(field, action, location);
        FieldBuilder::new(self.clone(), index)
    }

    /// `create_field` followed by every setter `options` names.
    #[track_caller]
    pub fn create_field_with(&self, name: &str, options: FieldOptions) -> FieldBuilder {
        options.apply(self.create_field(name))
    }

    /// Declare a replacement for an existing field. The replacement starts
    /// from scratch: attributes not set again are not carried over.
    #[track_caller]
    pub fn edit_field(&self, name: &str) -> FieldBuilder {
        let location = SourceLocation::caller();
        let field = FieldDescriptor {
            is_edit: true,
            ..FieldDescriptor::named(name)
        };
        let action = ActionKind::EditField {
            content_type: self.id.clone(),
            kind: self.kind,
            field: field.uid.clone(),
        };
        let index = self.declare_field(field, action, location);
        FieldBuilder::new(self.clone(), index)
    }

    #[track_caller]
    pub fn edit_field_with(&self, name: &str, options: FieldOptions) -> FieldBuilder {
        options.apply(self.edit_field(name))
    }

    #[track_caller]
    pub fn delete_field(&self, name: &str) -> &Self {
        let location = SourceLocation::caller();
        let field = FieldDescriptor {
            uid: field_uid(name),
            is_delete: true,
            ..Default::default()
        };
        let action = ActionKind::DeleteField {
            content_type: self.id.clone(),
            kind: self.kind,
            field: field.uid.clone(),
        };
        self.declare_field(field, action, location);
        self
    }

    // ── Moves ──

    /// Name the field the next terminal move method repositions.
    pub fn move_field(&self, name: &str) -> &Self {
        let uid = field_uid(name);
        self.with_draft(|d| d.pending_move = Some(uid));
        self
    }

    #[track_caller]
    pub fn to_the_top(&self) -> Result<&Self> {
        self.queue_move(MoveOperation::Top, None, SourceLocation::caller())
    }

    #[track_caller]
    pub fn to_the_bottom(&self) -> Result<&Self> {
        self.queue_move(MoveOperation::Bottom, None, SourceLocation::caller())
    }

    #[track_caller]
    pub fn before_field(&self, anchor: &str) -> Result<&Self> {
        self.queue_move(MoveOperation::Before, Some(anchor), SourceLocation::caller())
    }

    #[track_caller]
    pub fn after_field(&self, anchor: &str) -> Result<&Self> {
        self.queue_move(MoveOperation::After, Some(anchor), SourceLocation::caller())
    }

    /// Queue the pending move. Without a preceding `move_field` this is a
    /// usage error, returned immediately and also recorded as a script error
    /// at the offending call.
    fn queue_move(
        &self,
        operation: MoveOperation,
        anchor: Option<&str>,
        location: SourceLocation,
    ) -> Result<&Self> {
        self.run.with(|r| {
            let draft = r.get_by_kind(&self.id, self.kind);
            let Some(field) = draft.pending_move.take() else {
                let message = format!("{operation} called without a preceding move_field");
                r.dispatch(
                    ActionKind::ScriptError {
                        message: message.clone(),
                        function: Some(operation.as_str().to_string()),
                    },
                    location,
                );
                return Err(MigrationError::Usage(message));
            };
            let movement = match anchor {
                Some(anchor) => MoveFieldAction::relative(operation, field, field_uid(anchor)),
                None => MoveFieldAction::new(operation, field),
            };
            draft.moves.push(movement.clone());
            let seq = draft.moves.len() - 1;
            r.dispatch(
                ActionKind::MoveField {
                    content_type: self.id.clone(),
                    kind: self.kind,
                    seq,
                    movement,
                },
                location,
            );
            Ok(())
        })?;
        Ok(self)
    }
}

impl SchemaOptionsSetter for ContentTypeBuilder {
    fn set_schema_option(&self, key: &str, value: Value) {
        self.with_draft(|d| {
            let options = d
                .properties
                .entry("options")
                .or_insert_with(|| Value::Object(Map::new()));
            if !options.is_object() {
                *options = Value::Object(Map::new());
            }
            if let Value::Object(map) = options {
                map.insert(key.to_string(), value);
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
