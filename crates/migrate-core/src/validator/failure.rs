use super::{ValidationContext, ValidationError, Validator};
use crate::action::{Action, ActionKind, ActionTag};
use crate::diagnostics::ErrorKind;

/// Reports a remote call that failed while a task group ran, with the
/// server's message and any per-field details it sent.
pub struct ApiErrorValidator;

impl Validator for ApiErrorValidator {
    fn name(&self) -> &'static str {
        "api-error"
    }

    fn tags(&self) -> &'static [ActionTag] {
        &[ActionTag::ApiError]
    }

    fn validate(&self, action: &Action, _ctx: &ValidationContext<'_>) -> Vec<ValidationError> {
        let ActionKind::ApiError { task, error } = &action.kind else {
            return Vec::new();
        };
        let mut message = format!("{task}: {}", error.message);
        if let Some(details) = &error.errors {
            message.push_str(&format!(" {details}"));
        }
        vec![ValidationError::new(ErrorKind::Api, message)]
    }
}

/// Reports an error that escaped the script body.
pub struct ScriptErrorValidator;

impl Validator for ScriptErrorValidator {
    fn name(&self) -> &'static str {
        "script-error"
    }

    fn tags(&self) -> &'static [ActionTag] {
        &[ActionTag::ScriptError]
    }

    fn validate(&self, action: &Action, _ctx: &ValidationContext<'_>) -> Vec<ValidationError> {
        let ActionKind::ScriptError { message, function } = &action.kind else {
            return Vec::new();
        };
        let message = match function {
            Some(function) => format!("{message} (in {function})"),
            None => message.clone(),
        };
        vec![ValidationError::new(ErrorKind::Script, message)]
    }
}
