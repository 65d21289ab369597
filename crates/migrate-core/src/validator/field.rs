use super::{ValidationContext, ValidationError, Validator};
use crate::action::{Action, ActionKind, ActionTag};
use crate::diagnostics::ErrorKind;
use crate::types::PendingKind;

/// Field changes that make no sense for the declaration they were made on.
///
/// - Any field or move call on a content type that is being deleted.
/// - `delete_field` on a content type that is being created.
/// - `edit_field` on a content type that is being created, unless the same
///   script created that field first.
///
/// Create-kind moves are left to [`MoveTargetValidator`](super::MoveTargetValidator),
/// which is registered ahead of this one.
pub struct FieldChangeValidator;

fn field_change(action: &Action) -> Option<(&str, PendingKind, Option<&str>)> {
    match &action.kind {
        ActionKind::CreateField {
            content_type,
            kind,
            field,
        }
        | ActionKind::EditField {
            content_type,
            kind,
            field,
        }
        | ActionKind::DeleteField {
            content_type,
            kind,
            field,
        } => Some((content_type.as_str(), *kind, Some(field.as_str()))),
        ActionKind::MoveField {
            content_type, kind, ..
        } => Some((content_type.as_str(), *kind, None)),
        _ => None,
    }
}

impl Validator for FieldChangeValidator {
    fn name(&self) -> &'static str {
        "field-change"
    }

    fn tags(&self) -> &'static [ActionTag] {
        &[
            ActionTag::CreateField,
            ActionTag::EditField,
            ActionTag::DeleteField,
            ActionTag::MoveField,
        ]
    }

    fn is_applicable(&self, action: &Action) -> bool {
        match field_change(action) {
            Some((_, PendingKind::Delete, _)) => true,
            Some((_, PendingKind::Create, _)) => {
                matches!(action.tag(), ActionTag::EditField | ActionTag::DeleteField)
            }
            _ => false,
        }
    }

    fn validate(&self, action: &Action, ctx: &ValidationContext<'_>) -> Vec<ValidationError> {
        let Some((content_type, kind, field)) = field_change(action) else {
            return Vec::new();
        };
        let call = match &action.kind {
            ActionKind::MoveField { movement, .. } => movement.operation.as_str(),
            _ => action.tag().as_str(),
        };
        let field = field.unwrap_or_default();

        let message = match (kind, action.tag()) {
            (PendingKind::Delete, _) => {
                format!("{call} cannot be used on '{content_type}', which is being deleted.")
            }
            (_, ActionTag::DeleteField) => {
                format!("{field} cannot be deleted from '{content_type}', which is being created.")
            }
            (_, ActionTag::EditField) => {
                let created_earlier = ctx.earlier_actions(action).iter().any(|a| match &a.kind {
                    ActionKind::CreateField {
                        content_type: ct,
                        kind: PendingKind::Create,
                        field: f,
                    } => ct == content_type && f == field,
                    _ => false,
                });
                if created_earlier {
                    return Vec::new();
                }
                format!("{field} does not exist in schema")
            }
            _ => return Vec::new(),
        };
        let kind = if action.tag() == ActionTag::EditField {
            ErrorKind::MissingField
        } else {
            ErrorKind::InvalidField
        };
        vec![ValidationError::new(kind, message)]
    }
}

#[cfg(test)]
mod tests {
    use crate::migration::Migration;
    use crate::registry::RunContext;
    use crate::validator::ValidatorChain;
    use serde_json::json;

    fn validate(script: impl FnOnce(&Migration)) -> Vec<String> {
        let run = RunContext::new();
        script(&Migration::new(run.clone()));
        run.with(|r| ValidatorChain::default().validate_all(r))
            .into_iter()
            .map(|d| d.message)
            .collect()
    }

    fn blog(m: &Migration) -> crate::ContentTypeBuilder {
        m.create_content_type("blog", json!({ "title": "Blog", "description": "Posts" }))
    }

    #[test]
    fn delete_field_on_create_is_rejected() {
        let errors = validate(|m| {
            let b = blog(m);
            b.create_field("a");
            b.delete_field("ghost");
        });
        assert_eq!(
            errors,
            vec!["ghost cannot be deleted from 'blog', which is being created."]
        );
    }

    #[test]
    fn edit_field_on_create_needs_earlier_create_field() {
        let errors = validate(|m| {
            let b = blog(m);
            b.create_field("a");
            b.edit_field("a").display_name("A");
            b.edit_field("ghost");
        });
        assert_eq!(errors, vec!["ghost does not exist in schema"]);
    }

    #[test]
    fn field_calls_on_delete_are_rejected() {
        let errors = validate(|m| {
            let b = m.delete_content_type("old");
            b.create_field("a");
            b.move_field("a").to_the_top().unwrap();
        });
        assert_eq!(
            errors,
            vec![
                "create_field cannot be used on 'old', which is being deleted.",
                "to_the_top cannot be used on 'old', which is being deleted.",
            ]
        );
    }

    #[test]
    fn edit_kind_field_changes_pass() {
        let errors = validate(|m| {
            let b = m.edit_content_type("blog", json!({ "title": "Blog" }));
            b.edit_field("title");
            b.delete_field("legacy");
        });
        assert!(errors.is_empty(), "{errors:?}");
    }
}
