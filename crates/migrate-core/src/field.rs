//! Field builder and the equivalent options object.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::ops::Deref;

use crate::builder::{ContentTypeBuilder, SchemaOptionsSetter};
use crate::types::FieldDescriptor;

/// Setters for one declared field. Derefs to the owning
/// [`ContentTypeBuilder`] so declarations chain:
///
/// ```ignore
/// blog.create_field("Title").data_type("text").mandatory(true)
///     .create_field("Body").data_type("text");
/// ```
#[derive(Debug, Clone)]
pub struct FieldBuilder {
    content_type: ContentTypeBuilder,
    index: usize,
}

impl FieldBuilder {
    pub(crate) fn new(content_type: ContentTypeBuilder, index: usize) -> Self {
        Self {
            content_type,
            index,
        }
    }

    fn update(self, f: impl FnOnce(&mut FieldDescriptor)) -> Self {
        let index = self.index;
        self.content_type.with_draft(|d| {
            if let Some(field) = d.schema.get_mut(index) {
                f(field);
            }
        });
        self
    }

    /// The descriptor as currently declared.
    pub fn descriptor(&self) -> Option<FieldDescriptor> {
        self.content_type
            .with_draft(|d| d.schema.get(self.index).cloned())
    }

    pub fn display_name(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.update(|f| f.display_name = name)
    }

    pub fn data_type(self, data_type: impl Into<String>) -> Self {
        let data_type = data_type.into();
        self.update(|f| f.data_type = data_type)
    }

    pub fn mandatory(self, mandatory: bool) -> Self {
        self.update(|f| f.mandatory = mandatory)
    }

    pub fn unique(self, unique: bool) -> Self {
        self.update(|f| f.unique = unique)
    }

    pub fn default_value(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.update(|f| f.default_value = Some(value))
    }

    pub fn reference_to<I, S>(self, content_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let refs: Vec<String> = content_types.into_iter().map(Into::into).collect();
        self.update(|f| f.reference_to = Some(refs))
    }

    pub fn taxonomies(self, taxonomies: Vec<Value>) -> Self {
        self.update(|f| f.taxonomies = Some(taxonomies))
    }

    pub fn multiple(self, multiple: bool) -> Self {
        self.update(|f| f.multiple = Some(multiple))
    }

    pub fn field_metadata(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        self.update(|f| {
            f.field_metadata.insert(key, value);
        })
    }

    /// Whether a reference field may point at several entries.
    pub fn ref_multiple(self, value: bool) -> Self {
        self.field_metadata("ref_multiple", value)
    }
}

impl Deref for FieldBuilder {
    type Target = ContentTypeBuilder;

    fn deref(&self) -> &ContentTypeBuilder {
        &self.content_type
    }
}

impl SchemaOptionsSetter for FieldBuilder {
    fn set_schema_option(&self, key: &str, value: Value) {
        self.content_type.set_schema_option(key, value);
    }
}

// ---------------------------------------------------------------------------
// FieldOptions
// ---------------------------------------------------------------------------

/// Options accepted by `create_field_with` / `edit_field_with`. Each present
/// key is applied through the setter of the same name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldOptions {
    pub display_name: Option<String>,
    pub data_type: Option<String>,
    pub mandatory: Option<bool>,
    pub unique: Option<bool>,
    #[serde(rename = "default")]
    pub default_value: Option<Value>,
    pub reference_to: Option<Vec<String>>,
    pub taxonomies: Option<Vec<Value>>,
    pub multiple: Option<bool>,
    pub ref_multiple: Option<bool>,
    pub field_metadata: Option<Map<String, Value>>,
}

impl FieldOptions {
    pub fn apply(self, mut field: FieldBuilder) -> FieldBuilder {
        if let Some(v) = self.display_name {
            field = field.display_name(v);
        }
        if let Some(v) = self.data_type {
            field = field.data_type(v);
        }
        if let Some(v) = self.mandatory {
            field = field.mandatory(v);
        }
        if let Some(v) = self.unique {
            field = field.unique(v);
        }
        if let Some(v) = self.default_value {
            field = field.default_value(v);
        }
        if let Some(v) = self.reference_to {
            field = field.reference_to(v);
        }
        if let Some(v) = self.taxonomies {
            field = field.taxonomies(v);
        }
        if let Some(v) = self.multiple {
            field = field.multiple(v);
        }
        if let Some(v) = self.ref_multiple {
            field = field.ref_multiple(v);
        }
        for (key, value) in self.field_metadata.unwrap_or_default() {
            field = field.field_metadata(key, value);
        }
        field
    }
}
