//! Schema merge and field repositioning.
//!
//! Both operate on a plain `Vec<FieldDescriptor>`: the schema being built for
//! one content type in one pass.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MigrationError, Result};
use crate::types::FieldDescriptor;

// ---------------------------------------------------------------------------
// MoveFieldAction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveOperation {
    Top,
    Bottom,
    Before,
    After,
}

impl MoveOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            MoveOperation::Top => "to_the_top",
            MoveOperation::Bottom => "to_the_bottom",
            MoveOperation::Before => "before_field",
            MoveOperation::After => "after_field",
        }
    }
}

impl fmt::Display for MoveOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One queued reposition. `against` is the anchor for `Before`/`After`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveFieldAction {
    pub operation: MoveOperation,
    pub field_to_move: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub against: Option<String>,
}

impl MoveFieldAction {
    pub fn new(operation: MoveOperation, field_to_move: impl Into<String>) -> Self {
        Self {
            operation,
            field_to_move: field_to_move.into(),
            against: None,
        }
    }

    pub fn relative(
        operation: MoveOperation,
        field_to_move: impl Into<String>,
        against: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            field_to_move: field_to_move.into(),
            against: Some(against.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Edit merge
// ---------------------------------------------------------------------------

/// Merge newly declared descriptors into a content type's existing schema.
///
/// For each declared field with a same-uid existing field: an edit replaces
/// the existing field in place, a delete removes it (and is itself dropped),
/// anything else is kept alongside it. Declared fields that survive are
/// appended after the existing ones. An edit or delete with no existing
/// counterpart fails the whole merge.
pub fn merge_edit_schema(
    existing: Vec<FieldDescriptor>,
    declared: Vec<FieldDescriptor>,
) -> Result<Vec<FieldDescriptor>> {
    let mut merged = existing;
    let mut appended = Vec::new();

    for mut field in declared {
        let position = merged.iter().position(|f| f.uid == field.uid);
        if field.is_edit {
            let Some(i) = position else {
                return Err(MigrationError::MissingSchemaField(field.uid));
            };
            field.is_edit = false;
            merged[i] = field;
        } else if field.is_delete {
            let Some(i) = position else {
                return Err(MigrationError::MissingSchemaField(field.uid));
            };
            merged.remove(i);
        } else {
            appended.push(field);
        }
    }

    merged.extend(appended);
    Ok(merged)
}

// ---------------------------------------------------------------------------
// Reposition
// ---------------------------------------------------------------------------

fn position(schema: &[FieldDescriptor], uid: &str) -> Option<usize> {
    schema.iter().position(|f| f.uid == uid)
}

fn missing(uid: &str) -> String {
    format!("{uid} does not exist in schema")
}

/// Confirm that the field to move and its anchor (if any) both exist in
/// `schema` as it currently stands.
pub fn get_validated(
    schema: &[FieldDescriptor],
    movement: &MoveFieldAction,
) -> std::result::Result<(), Vec<String>> {
    let mut errors = Vec::new();
    if position(schema, &movement.field_to_move).is_none() {
        errors.push(missing(&movement.field_to_move));
    }
    match (&movement.against, movement.operation) {
        (Some(anchor), _) => {
            if position(schema, anchor).is_none() {
                errors.push(missing(anchor));
            }
        }
        (None, MoveOperation::Before | MoveOperation::After) => {
            errors.push(format!(
                "{} requires a field to move against",
                movement.operation
            ));
        }
        (None, _) => {}
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate `movement` against the current schema and apply it. On error the
/// schema is left untouched.
pub fn apply_move(
    schema: &mut Vec<FieldDescriptor>,
    movement: &MoveFieldAction,
) -> std::result::Result<(), Vec<String>> {
    get_validated(schema, movement)?;

    let uid = movement.field_to_move.as_str();
    if movement.against.as_deref() == Some(uid) {
        return Ok(());
    }

    let Some(from) = position(schema, uid) else {
        return Err(vec![missing(uid)]);
    };
    let field = schema.remove(from);

    let target = match movement.operation {
        MoveOperation::Top => 0,
        MoveOperation::Bottom => schema.len(),
        MoveOperation::Before | MoveOperation::After => {
            let anchor = movement.against.as_deref().unwrap_or_default();
            match position(schema, anchor) {
                Some(i) if movement.operation == MoveOperation::After => i + 1,
                Some(i) => i,
                None => {
                    schema.insert(from, field);
                    return Err(vec![missing(anchor)]);
                }
            }
        }
    };
    schema.insert(target, field);
    Ok(())
}

/// A move that could not be applied, with its index in the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveError {
    pub seq: usize,
    pub messages: Vec<String>,
}

/// Apply queued moves in dispatch order, each validated against the schema
/// produced by the moves before it. Invalid moves are skipped and reported.
pub fn apply_moves(schema: &mut Vec<FieldDescriptor>, moves: &[MoveFieldAction]) -> Vec<MoveError> {
    let mut errors = Vec::new();
    for (seq, movement) in moves.iter().enumerate() {
        if let Err(messages) = apply_move(schema, movement) {
            tracing::debug!(seq, ?messages, "skipping invalid move");
            errors.push(MoveError { seq, messages });
        }
    }
    errors
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(uids: &[&str]) -> Vec<FieldDescriptor> {
        uids.iter().map(|u| FieldDescriptor::named(u)).collect()
    }

    fn uids(schema: &[FieldDescriptor]) -> Vec<&str> {
        schema.iter().map(|f| f.uid.as_str()).collect()
    }

    fn edit(uid: &str) -> FieldDescriptor {
        FieldDescriptor {
            is_edit: true,
            ..FieldDescriptor::named(uid)
        }
    }

    fn delete(uid: &str) -> FieldDescriptor {
        FieldDescriptor {
            is_delete: true,
            ..FieldDescriptor::named(uid)
        }
    }

    #[test]
    fn edit_replaces_in_place() {
        let mut changed = edit("title");
        changed.display_name = "Headline".into();
        let merged = merge_edit_schema(schema(&["title"]), vec![changed]).unwrap();
        assert_eq!(uids(&merged), vec!["title"]);
        assert_eq!(merged[0].display_name, "Headline");
        assert!(!merged[0].is_edit);
    }

    #[test]
    fn edit_of_missing_field_fails() {
        let err = merge_edit_schema(schema(&["title"]), vec![edit("missing")]).unwrap_err();
        assert_eq!(err.to_string(), "missing does not exist in the schema");
    }

    #[test]
    fn delete_removes_both() {
        let merged =
            merge_edit_schema(schema(&["title", "body", "url"]), vec![delete("body")]).unwrap();
        assert_eq!(uids(&merged), vec!["title", "url"]);
    }

    #[test]
    fn delete_of_missing_field_fails() {
        let err = merge_edit_schema(schema(&["title"]), vec![delete("ghost")]).unwrap_err();
        assert!(matches!(err, MigrationError::MissingSchemaField(uid) if uid == "ghost"));
    }

    #[test]
    fn new_fields_append_after_existing() {
        let merged = merge_edit_schema(
            schema(&["title", "url"]),
            vec![FieldDescriptor::named("summary"), edit("url")],
        )
        .unwrap();
        assert_eq!(uids(&merged), vec!["title", "url", "summary"]);
    }

    #[test]
    fn plain_create_with_existing_uid_keeps_both() {
        let merged =
            merge_edit_schema(schema(&["title"]), vec![FieldDescriptor::named("title")]).unwrap();
        assert_eq!(uids(&merged), vec!["title", "title"]);
    }

    #[test]
    fn to_the_top_moves_field_first() {
        let mut s = schema(&["b", "a", "c"]);
        apply_move(&mut s, &MoveFieldAction::new(MoveOperation::Top, "a")).unwrap();
        assert_eq!(uids(&s), vec!["a", "b", "c"]);

        let mut already = schema(&["a", "b", "c"]);
        apply_move(&mut already, &MoveFieldAction::new(MoveOperation::Top, "a")).unwrap();
        assert_eq!(uids(&already), vec!["a", "b", "c"]);
    }

    #[test]
    fn to_the_bottom_moves_field_last() {
        let mut s = schema(&["a", "b", "c"]);
        apply_move(&mut s, &MoveFieldAction::new(MoveOperation::Bottom, "a")).unwrap();
        assert_eq!(uids(&s), vec!["b", "c", "a"]);
    }

    #[test]
    fn after_and_before_field() {
        let mut s = schema(&["a", "b", "c", "d"]);
        apply_move(&mut s, &MoveFieldAction::relative(MoveOperation::After, "a", "c")).unwrap();
        assert_eq!(uids(&s), vec!["b", "c", "a", "d"]);

        apply_move(&mut s, &MoveFieldAction::relative(MoveOperation::Before, "d", "b")).unwrap();
        assert_eq!(uids(&s), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn missing_anchor_reports_and_does_not_reorder() {
        let mut s = schema(&["a", "b", "c"]);
        let err = apply_move(
            &mut s,
            &MoveFieldAction::relative(MoveOperation::After, "a", "zzz"),
        )
        .unwrap_err();
        assert_eq!(err, vec!["zzz does not exist in schema".to_string()]);
        assert_eq!(uids(&s), vec!["a", "b", "c"]);

        let err = apply_move(
            &mut s,
            &MoveFieldAction::relative(MoveOperation::Before, "c", "zzz"),
        )
        .unwrap_err();
        assert_eq!(err, vec!["zzz does not exist in schema".to_string()]);
        assert_eq!(uids(&s), vec!["a", "b", "c"]);
    }

    #[test]
    fn missing_field_and_anchor_both_reported() {
        let s = schema(&["a"]);
        let err = get_validated(
            &s,
            &MoveFieldAction::relative(MoveOperation::Before, "x", "y"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            vec![
                "x does not exist in schema".to_string(),
                "y does not exist in schema".to_string()
            ]
        );
    }

    #[test]
    fn moves_validate_against_current_snapshot() {
        let mut s = schema(&["a", "b", "c"]);
        let moves = vec![
            MoveFieldAction::new(MoveOperation::Bottom, "a"),
            MoveFieldAction::relative(MoveOperation::After, "c", "ghost"),
            MoveFieldAction::relative(MoveOperation::Before, "c", "b"),
        ];
        let errors = apply_moves(&mut s, &moves);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].seq, 1);
        assert_eq!(uids(&s), vec!["c", "b", "a"]);
    }

    #[test]
    fn moving_against_itself_is_a_no_op() {
        let mut s = schema(&["a", "b"]);
        apply_move(&mut s, &MoveFieldAction::relative(MoveOperation::After, "b", "b")).unwrap();
        assert_eq!(uids(&s), vec!["a", "b"]);
    }
}
