use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use super::{ValidationContext, ValidationError, Validator};
use crate::action::{Action, ActionKind, ActionTag};
use crate::diagnostics::ErrorKind;
use crate::registry::ContentTypeDraft;
use crate::types::PendingKind;

const CREATE_MANDATORY: &[&str] = &["uid", "title", "description"];
const EDIT_MANDATORY: &[&str] = &["uid", "title"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonType {
    String,
    Boolean,
    Object,
}

impl JsonType {
    fn as_str(self) -> &'static str {
        match self {
            JsonType::String => "string",
            JsonType::Boolean => "boolean",
            JsonType::Object => "object",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            JsonType::String => value.is_string(),
            JsonType::Boolean => value.is_boolean(),
            JsonType::Object => value.is_object(),
        }
    }
}

/// Properties a script may pass to create/edit, with their expected types.
const ALLOWED: &[(&str, JsonType)] = &[
    ("uid", JsonType::String),
    ("title", JsonType::String),
    ("description", JsonType::String),
    ("options", JsonType::Object),
    ("force", JsonType::Boolean),
];

const UID_RULE: &str = concat!(
    "must start with a lowercase letter ",
    "and contain only lowercase letters, digits and underscores."
);

static UID_RE: OnceLock<Regex> = OnceLock::new();

fn uid_re() -> &'static Regex {
    UID_RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").unwrap())
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Structural checks for `create_content_type` / `edit_content_type`.
///
/// Unknown keys are checked against what the script passed in that call;
/// mandatory keys and types are checked against the draft as the script
/// left it, so setters called later (`.title(..)`) count. A content type
/// declared more than once shares one draft, so the draft is only checked
/// on its first declaration.
pub struct ContentTypeValidator;

impl ContentTypeValidator {
    fn check_keys(options: &serde_json::Map<String, Value>) -> Vec<ValidationError> {
        options
            .keys()
            .filter(|key| !ALLOWED.iter().any(|(name, _)| *name == key.as_str()))
            .map(|key| {
                ValidationError::new(
                    ErrorKind::UnknownProperty,
                    format!("{key} is not a valid property."),
                )
            })
            .collect()
    }

    fn check_draft(draft: Option<&ContentTypeDraft>, mandatory: &[&str]) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let properties = draft.map(|d| &d.properties);
        for key in mandatory {
            if is_blank(properties.and_then(|p| p.get(*key))) {
                errors.push(ValidationError::new(
                    ErrorKind::MissingProperty,
                    format!("{key} is missing."),
                ));
            }
        }

        let Some(properties) = properties else {
            return errors;
        };
        for (key, expected) in ALLOWED {
            match properties.get(*key) {
                Some(Value::Null) | None => {}
                Some(value) if !expected.matches(value) => {
                    errors.push(ValidationError::new(
                        ErrorKind::TypeMismatch,
                        format!("{key} must be of type {}.", expected.as_str()),
                    ));
                }
                Some(_) => {}
            }
        }

        if let Some(uid) = properties.get("uid").and_then(Value::as_str) {
            if !uid.is_empty() && !uid_re().is_match(uid) {
                errors.push(ValidationError::new(
                    ErrorKind::InvalidProperty,
                    format!("uid '{uid}' {UID_RULE}"),
                ));
            }
        }

        errors
    }
}

impl Validator for ContentTypeValidator {
    fn name(&self) -> &'static str {
        "content-type"
    }

    fn tags(&self) -> &'static [ActionTag] {
        &[ActionTag::CreateContentType, ActionTag::EditContentType]
    }

    fn validate(&self, action: &Action, ctx: &ValidationContext<'_>) -> Vec<ValidationError> {
        let (id, options, kind, mandatory) = match &action.kind {
            ActionKind::CreateContentType {
                content_type,
                options,
            } => (content_type, options, PendingKind::Create, CREATE_MANDATORY),
            ActionKind::EditContentType {
                content_type,
                options,
            } => (content_type, options, PendingKind::Edit, EDIT_MANDATORY),
            _ => return Vec::new(),
        };
        let mut errors = Self::check_keys(options);
        let declared_earlier = ctx.earlier_actions(action).iter().any(|a| {
            a.tag() == action.tag()
                && match &a.kind {
                    ActionKind::CreateContentType { content_type, .. }
                    | ActionKind::EditContentType { content_type, .. } => content_type == id,
                    _ => false,
                }
        });
        if !declared_earlier {
            errors.extend(Self::check_draft(ctx.registry.find_by_kind(id, kind), mandatory));
        }
        errors
    }
}
