//! Pending-change registry.
//!
//! Holds, per content-type uid, the in-progress declarations a script has made,
//! plus two reserved lists: the dispatched actions and the queued task groups.
//! A registry belongs to exactly one script run; [`RunContext`] is the handle
//! builders and tasks share it through.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

use crate::action::{ActionKind, ActionLog, SourceLocation};
use crate::error::{MigrationError, Result};
use crate::schema::MoveFieldAction;
use crate::task::TaskGroup;
use crate::types::{ContentType, FieldDescriptor, PendingKind};

// ---------------------------------------------------------------------------
// ContentTypeDraft
// ---------------------------------------------------------------------------

/// One pending declaration (create, edit or delete) for a content type.
///
/// Top-level properties (`uid`, `title`, `description`, `options`, `force`,
/// and anything else the script supplied) are kept as a JSON map so the
/// validator can see exactly what was declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentTypeDraft {
    pub properties: Map<String, Value>,
    pub schema: Vec<FieldDescriptor>,
    pub moves: Vec<MoveFieldAction>,
    /// Field named by `move_field`, waiting for a terminal move method.
    pub pending_move: Option<String>,
}

impl ContentTypeDraft {
    pub fn with_properties(properties: Map<String, Value>) -> Self {
        Self {
            properties,
            ..Default::default()
        }
    }

    fn str_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    pub fn uid(&self) -> Option<&str> {
        self.str_property("uid")
    }

    pub fn title(&self) -> Option<&str> {
        self.str_property("title")
    }

    pub fn description(&self) -> Option<&str> {
        self.str_property("description")
    }

    pub fn force(&self) -> bool {
        self.properties
            .get("force")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Build the wire representation: declared properties plus schema, minus
    /// engine-only keys.
    pub fn to_content_type(&self) -> Result<ContentType> {
        let mut body = self.properties.clone();
        body.remove("force");
        body.insert("schema".into(), serde_json::to_value(&self.schema)?);
        Ok(serde_json::from_value(Value::Object(body))?)
    }
}

// ---------------------------------------------------------------------------
// PendingChange
// ---------------------------------------------------------------------------

/// Everything pending for one content-type uid, split by kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingChange {
    pub create: Option<ContentTypeDraft>,
    pub edit: Option<ContentTypeDraft>,
    pub delete: Option<ContentTypeDraft>,
    /// The remote content type, once an edit task has fetched it.
    pub existing: Option<ContentType>,
}

impl PendingChange {
    pub fn by_kind(&self, kind: PendingKind) -> Option<&ContentTypeDraft> {
        match kind {
            PendingKind::Create => self.create.as_ref(),
            PendingKind::Edit => self.edit.as_ref(),
            PendingKind::Delete => self.delete.as_ref(),
        }
    }

    fn slot(&mut self, kind: PendingKind) -> &mut Option<ContentTypeDraft> {
        match kind {
            PendingKind::Create => &mut self.create,
            PendingKind::Edit => &mut self.edit,
            PendingKind::Delete => &mut self.delete,
        }
    }

    /// The draft for `kind`, created empty on first access.
    pub fn by_kind_mut(&mut self, kind: PendingKind) -> &mut ContentTypeDraft {
        self.slot(kind).get_or_insert_with(ContentTypeDraft::default)
    }

    pub fn set_kind(&mut self, kind: PendingKind, draft: ContentTypeDraft) {
        *self.slot(kind) = Some(draft);
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<String, PendingChange>,
    actions: ActionLog,
    task_groups: Vec<TaskGroup>,
}

impl Registry {
    /// The entry for `id`, inserted empty if absent. Never "not found".
    pub fn get(&mut self, id: &str) -> &mut PendingChange {
        self.entries.entry(id.to_string()).or_default()
    }

    /// Read-only lookup that does not insert.
    pub fn peek(&self, id: &str) -> Option<&PendingChange> {
        self.entries.get(id)
    }

    pub fn set(&mut self, id: &str, entry: PendingChange) {
        self.entries.insert(id.to_string(), entry);
    }

    pub fn remove(&mut self, id: &str) -> Option<PendingChange> {
        self.entries.remove(id)
    }

    pub fn get_by_kind(&mut self, id: &str, kind: PendingKind) -> &mut ContentTypeDraft {
        self.get(id).by_kind_mut(kind)
    }

    pub fn find_by_kind(&self, id: &str, kind: PendingKind) -> Option<&ContentTypeDraft> {
        self.peek(id).and_then(|e| e.by_kind(kind))
    }

    /// Like [`find_by_kind`](Self::find_by_kind) but an absent draft is an
    /// error, for tasks that expect the declaration to exist.
    pub fn require(&self, id: &str, kind: PendingKind) -> Result<&ContentTypeDraft> {
        self.find_by_kind(id, kind)
            .ok_or_else(|| MigrationError::NoPendingChange(id.to_string(), kind.to_string()))
    }

    // ── Reserved: actions ──

    pub fn dispatch(&mut self, kind: ActionKind, location: SourceLocation) {
        self.actions.dispatch(kind, location);
    }

    pub fn actions(&self) -> &ActionLog {
        &self.actions
    }

    // ── Reserved: task groups ──

    pub fn push_task_group(&mut self, group: TaskGroup) {
        self.task_groups.push(group);
    }

    pub fn task_group_count(&self) -> usize {
        self.task_groups.len()
    }

    /// Drain the queued task groups in the order they were queued.
    pub fn take_task_groups(&mut self) -> Vec<TaskGroup> {
        std::mem::take(&mut self.task_groups)
    }

    /// Clear the two reserved lists. Content-type entries are kept.
    pub fn reset(&mut self) {
        self.actions.clear();
        self.task_groups.clear();
    }
}

// ---------------------------------------------------------------------------
// RunContext
// ---------------------------------------------------------------------------

/// Shared handle on the registry of one script run.
///
/// Cloning is cheap; every builder and task of the run holds one. Access is
/// sequential in practice, the mutex only makes the handle `Send`.
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: Uuid,
    registry: Arc<Mutex<Registry>>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Run `f` with exclusive access to the registry. The lock is never held
    /// across an await point.
    pub fn with<R>(&self, f: impl FnOnce(&mut Registry) -> R) -> R {
        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut registry)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn get_inserts_on_first_access() {
        let mut registry = Registry::default();
        assert!(registry.peek("blog").is_none());
        let entry = registry.get("blog");
        assert!(entry.create.is_none());
        assert!(registry.peek("blog").is_some());
    }

    #[test]
    fn get_by_kind_is_get_or_insert() {
        let mut registry = Registry::default();
        registry
            .get_by_kind("blog", PendingKind::Edit)
            .schema
            .push(FieldDescriptor::named("a"));
        assert_eq!(
            registry.find_by_kind("blog", PendingKind::Edit).unwrap().schema.len(),
            1
        );
        assert!(registry.find_by_kind("blog", PendingKind::Create).is_none());
    }

    #[test]
    fn set_and_remove() {
        let mut registry = Registry::default();
        let mut entry = PendingChange::default();
        entry.set_kind(PendingKind::Delete, ContentTypeDraft::default());
        registry.set("old", entry);
        assert!(registry.find_by_kind("old", PendingKind::Delete).is_some());
        assert!(registry.remove("old").is_some());
        assert!(registry.peek("old").is_none());
    }

    #[test]
    fn require_reports_missing_draft() {
        let registry = Registry::default();
        let err = registry.require("blog", PendingKind::Create).unwrap_err();
        assert_eq!(
            err.to_string(),
            "content type 'blog' has no pending create declaration"
        );
    }

    #[test]
    fn reset_keeps_entries() {
        let mut registry = Registry::default();
        registry.get_by_kind("blog", PendingKind::Create);
        registry.dispatch(
            ActionKind::DeleteContentType {
                content_type: "blog".into(),
            },
            SourceLocation::new("m.rs", 3),
        );
        registry.push_task_group(TaskGroup::new("t"));
        registry.reset();
        assert!(registry.actions().is_empty());
        assert_eq!(registry.task_group_count(), 0);
        assert!(registry.find_by_kind("blog", PendingKind::Create).is_some());
    }

    #[test]
    fn draft_to_content_type_drops_force() {
        let mut draft = ContentTypeDraft::with_properties(props(json!({
            "uid": "blog",
            "title": "Blog",
            "description": "Posts",
            "force": true,
            "options": { "singleton": false }
        })));
        draft.schema.push(FieldDescriptor::named("Title"));
        let ct = draft.to_content_type().unwrap();
        assert_eq!(ct.uid, "blog");
        assert_eq!(ct.schema.len(), 1);
        assert!(!ct.extra.contains_key("force"));
        assert_eq!(ct.options["singleton"], json!(false));
    }

    #[test]
    fn run_contexts_are_isolated() {
        let a = RunContext::new();
        let b = RunContext::new();
        a.with(|r| r.get_by_kind("blog", PendingKind::Create).pending_move = Some("x".into()));
        assert!(b.with(|r| r.peek("blog").is_none()));
        assert_ne!(a.run_id(), b.run_id());
        let a2 = a.clone();
        assert!(a2.with(|r| r.peek("blog").is_some()));
    }
}
