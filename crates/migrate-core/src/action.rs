//! Action records for every builder call a script makes.
//!
//! Actions drive validation and diagnostics only; execution is driven by the
//! task groups. An action is never mutated once dispatched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::panic::Location;

use crate::client::ApiError;
use crate::schema::MoveFieldAction;
use crate::types::PendingKind;

// ---------------------------------------------------------------------------
// SourceLocation
// ---------------------------------------------------------------------------

/// Where in a script a builder call was made.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column: 0,
        }
    }

    /// The location of whoever called the `#[track_caller]` function this is
    /// invoked from.
    #[track_caller]
    pub fn caller() -> Self {
        Location::caller().into()
    }
}

impl From<&Location<'_>> for SourceLocation {
    fn from(loc: &Location<'_>) -> Self {
        Self {
            file: loc.file().to_string(),
            line: loc.line(),
            column: loc.column(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

/// What a builder call declared. The variant is the tag validators key on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    CreateContentType {
        content_type: String,
        /// Options exactly as the script supplied them.
        options: Map<String, Value>,
    },
    EditContentType {
        content_type: String,
        options: Map<String, Value>,
    },
    DeleteContentType {
        content_type: String,
    },
    CreateField {
        content_type: String,
        kind: PendingKind,
        field: String,
    },
    EditField {
        content_type: String,
        kind: PendingKind,
        field: String,
    },
    DeleteField {
        content_type: String,
        kind: PendingKind,
        field: String,
    },
    MoveField {
        content_type: String,
        kind: PendingKind,
        /// Position of this move in the content type's move queue.
        seq: usize,
        movement: MoveFieldAction,
    },
    TransformEntries {
        content_type: String,
        from: Vec<String>,
        to: Vec<String>,
    },
    DeriveLinkedEntries {
        content_type: String,
        derive_fields: Vec<String>,
        ref_content_type: String,
        ref_field: String,
    },
    AddTask {
        title: String,
    },
    ApiError {
        task: String,
        error: ApiError,
    },
    ScriptError {
        message: String,
        /// The builder operation in flight when the script failed.
        function: Option<String>,
    },
}

impl ActionKind {
    pub fn tag(&self) -> ActionTag {
        match self {
            ActionKind::CreateContentType { .. } => ActionTag::CreateContentType,
            ActionKind::EditContentType { .. } => ActionTag::EditContentType,
            ActionKind::DeleteContentType { .. } => ActionTag::DeleteContentType,
            ActionKind::CreateField { .. } => ActionTag::CreateField,
            ActionKind::EditField { .. } => ActionTag::EditField,
            ActionKind::DeleteField { .. } => ActionTag::DeleteField,
            ActionKind::MoveField { .. } => ActionTag::MoveField,
            ActionKind::TransformEntries { .. } => ActionTag::TransformEntries,
            ActionKind::DeriveLinkedEntries { .. } => ActionTag::DeriveLinkedEntries,
            ActionKind::AddTask { .. } => ActionTag::AddTask,
            ActionKind::ApiError { .. } => ActionTag::ApiError,
            ActionKind::ScriptError { .. } => ActionTag::ScriptError,
        }
    }
}

// ---------------------------------------------------------------------------
// ActionTag
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTag {
    CreateContentType,
    EditContentType,
    DeleteContentType,
    CreateField,
    EditField,
    DeleteField,
    MoveField,
    TransformEntries,
    DeriveLinkedEntries,
    AddTask,
    ApiError,
    ScriptError,
}

impl ActionTag {
    /// The builder method a script calls to produce this action.
    pub fn as_str(self) -> &'static str {
        match self {
            ActionTag::CreateContentType => "create_content_type",
            ActionTag::EditContentType => "edit_content_type",
            ActionTag::DeleteContentType => "delete_content_type",
            ActionTag::CreateField => "create_field",
            ActionTag::EditField => "edit_field",
            ActionTag::DeleteField => "delete_field",
            ActionTag::MoveField => "move_field",
            ActionTag::TransformEntries => "transform_entries",
            ActionTag::DeriveLinkedEntries => "derive_linked_entries",
            ActionTag::AddTask => "add_task",
            ActionTag::ApiError => "api_error",
            ActionTag::ScriptError => "script_error",
        }
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub location: SourceLocation,
    pub dispatched_at: DateTime<Utc>,
}

impl Action {
    pub fn new(kind: ActionKind, location: SourceLocation) -> Self {
        Self {
            kind,
            location,
            dispatched_at: Utc::now(),
        }
    }

    pub fn tag(&self) -> ActionTag {
        self.kind.tag()
    }
}

// ---------------------------------------------------------------------------
// ActionLog
// ---------------------------------------------------------------------------

/// Append-only, dispatch-ordered list of actions for one run.
#[derive(Debug, Default)]
pub struct ActionLog {
    actions: Vec<Action>,
}

impl ActionLog {
    pub fn dispatch(&mut self, kind: ActionKind, location: SourceLocation) {
        tracing::debug!(action = %kind.tag(), at = %location, "dispatch");
        self.actions.push(Action::new(kind, location));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    pub fn last(&self) -> Option<&Action> {
        self.actions.last()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }
}
