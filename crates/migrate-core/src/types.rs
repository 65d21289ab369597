use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// ---------------------------------------------------------------------------
// PendingKind
// ---------------------------------------------------------------------------

/// Which declaration a pending change belongs to. One content type may carry
/// several kinds at once (e.g. a create and an edit in the same script).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingKind {
    Create,
    Edit,
    Delete,
}

impl PendingKind {
    pub fn all() -> &'static [PendingKind] {
        &[PendingKind::Create, PendingKind::Edit, PendingKind::Delete]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PendingKind::Create => "create",
            PendingKind::Edit => "edit",
            PendingKind::Delete => "delete",
        }
    }
}

impl fmt::Display for PendingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PendingKind {
    type Err = crate::error::MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(PendingKind::Create),
            "edit" => Ok(PendingKind::Edit),
            "delete" => Ok(PendingKind::Delete),
            _ => Err(crate::error::MigrationError::Usage(format!(
                "unknown pending kind '{s}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// FieldDescriptor
// ---------------------------------------------------------------------------

/// Derive a field uid from its human-readable name: lower-cased, spaces
/// replaced by underscores.
pub fn field_uid(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// One typed slot in a content type's schema.
///
/// `is_edit` / `is_delete` are local markers read once by
/// [`merge_edit_schema`](crate::schema::merge_edit_schema); they never reach
/// the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub uid: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_to: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub field_metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomies: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple: Option<bool>,
    /// Attributes the server returns that this engine does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub is_edit: bool,
    #[serde(skip)]
    pub is_delete: bool,
}

impl FieldDescriptor {
    /// A fresh descriptor whose uid is derived from `name` and whose display
    /// name is `name` itself.
    pub fn named(name: &str) -> Self {
        Self {
            uid: field_uid(name),
            display_name: name.to_string(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// ContentType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentType {
    pub uid: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub options: Map<String, Value>,
    #[serde(default)]
    pub schema: Vec<FieldDescriptor>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentType {
    pub fn field(&self, uid: &str) -> Option<&FieldDescriptor> {
        self.schema.iter().find(|f| f.uid == uid)
    }

    pub fn has_field(&self, uid: &str) -> bool {
        self.field(uid).is_some()
    }
}

// ---------------------------------------------------------------------------
// Locale
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locale {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_locale: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Locale {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: None,
            fallback_locale: None,
            extra: Map::new(),
        }
    }

    pub fn with_fallback(code: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            fallback_locale: Some(fallback.into()),
            ..Self::new(code)
        }
    }
}

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// A record of some content type. Entries are schemaless from the engine's
/// point of view; transforms read and write them as JSON maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entry(pub Map<String, Value>);

impl Entry {
    pub fn uid(&self) -> Option<&str> {
        self.0.get("uid").and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
