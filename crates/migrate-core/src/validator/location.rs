use super::{ValidationContext, ValidationError, Validator};
use crate::action::{Action, ActionKind, ActionTag};
use crate::diagnostics::ErrorKind;
use crate::schema::apply_move;
use crate::types::PendingKind;

fn missing(key: &str) -> ValidationError {
    ValidationError::new(ErrorKind::MissingProperty, format!("{key} is missing."))
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn blank_list(values: &[String]) -> bool {
    values.is_empty() || values.iter().any(|v| blank(v))
}

// ---------------------------------------------------------------------------
// FieldLocationValidator
// ---------------------------------------------------------------------------

/// Checks the field names an entry operation reads from and writes to.
///
/// Names must be present. When the content type is created by the same
/// script its schema is known here, and each name must also exist in it;
/// for content types that already exist remotely the check happens when the
/// task fetches the schema.
pub struct FieldLocationValidator;

impl FieldLocationValidator {
    fn check_declared(
        ctx: &ValidationContext<'_>,
        content_type: &str,
        fields: &[&String],
        errors: &mut Vec<ValidationError>,
    ) {
        let Some(draft) = ctx.registry.find_by_kind(content_type, PendingKind::Create) else {
            return;
        };
        for field in fields {
            if !blank(field) && !draft.schema.iter().any(|f| &f.uid == *field) {
                errors.push(ValidationError::new(
                    ErrorKind::MissingField,
                    format!("{field} does not exist in schema"),
                ));
            }
        }
    }
}

impl Validator for FieldLocationValidator {
    fn name(&self) -> &'static str {
        "field-location"
    }

    fn tags(&self) -> &'static [ActionTag] {
        &[ActionTag::TransformEntries, ActionTag::DeriveLinkedEntries]
    }

    fn validate(&self, action: &Action, ctx: &ValidationContext<'_>) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        match &action.kind {
            ActionKind::TransformEntries {
                content_type,
                from,
                to,
            } => {
                if blank(content_type) {
                    errors.push(missing("content_type"));
                }
                if blank_list(from) {
                    errors.push(missing("from"));
                }
                if blank_list(to) {
                    errors.push(missing("to"));
                }
                let fields: Vec<&String> = from.iter().chain(to).collect();
                Self::check_declared(ctx, content_type, &fields, &mut errors);
            }
            ActionKind::DeriveLinkedEntries {
                content_type,
                derive_fields,
                ref_content_type,
                ref_field,
            } => {
                if blank(content_type) {
                    errors.push(missing("content_type"));
                }
                if blank_list(derive_fields) {
                    errors.push(missing("derive_fields"));
                }
                if blank(ref_content_type) {
                    errors.push(missing("ref_content_type"));
                }
                if blank(ref_field) {
                    errors.push(missing("ref_field"));
                }
                let fields: Vec<&String> =
                    derive_fields.iter().chain(std::iter::once(ref_field)).collect();
                Self::check_declared(ctx, content_type, &fields, &mut errors);
            }
            _ => {}
        }
        errors
    }
}

// ---------------------------------------------------------------------------
// MoveTargetValidator
// ---------------------------------------------------------------------------

/// Replays the queued moves of a content type created in this script against
/// its declared schema and reports the targets of the move this action
/// queued. Moves on edited content types are checked by the edit task once
/// the remote schema is known, so they are not applicable here.
pub struct MoveTargetValidator;

impl Validator for MoveTargetValidator {
    fn name(&self) -> &'static str {
        "move-target"
    }

    fn tags(&self) -> &'static [ActionTag] {
        &[ActionTag::MoveField]
    }

    fn is_applicable(&self, action: &Action) -> bool {
        matches!(
            action.kind,
            ActionKind::MoveField {
                kind: PendingKind::Create,
                ..
            }
        )
    }

    fn validate(&self, action: &Action, ctx: &ValidationContext<'_>) -> Vec<ValidationError> {
        let ActionKind::MoveField {
            content_type, seq, ..
        } = &action.kind
        else {
            return Vec::new();
        };
        let Some(draft) = ctx.registry.find_by_kind(content_type, PendingKind::Create) else {
            return Vec::new();
        };

        let mut schema = draft.schema.clone();
        for (i, movement) in draft.moves.iter().enumerate().take(seq + 1) {
            let result = apply_move(&mut schema, movement);
            if i == *seq {
                return match result {
                    Ok(()) => Vec::new(),
                    Err(messages) => messages
                        .into_iter()
                        .map(|m| ValidationError::new(ErrorKind::MissingField, m))
                        .collect(),
                };
            }
        }
        Vec::new()
    }
}
