//! Structural validation of a script's actions.
//!
//! Each action is checked by exactly one validator: the first registered
//! validator for the action's tag whose `is_applicable` accepts it. Later
//! validators are never consulted for that action, even when the chosen one
//! reports nothing.

mod content_type;
mod failure;
mod field;
mod location;

pub use content_type::ContentTypeValidator;
pub use failure::{ApiErrorValidator, ScriptErrorValidator};
pub use field::FieldChangeValidator;
pub use location::{FieldLocationValidator, MoveTargetValidator};

use std::collections::HashMap;

use crate::action::{Action, ActionTag};
use crate::diagnostics::{Diagnostic, ErrorKind};
use crate::registry::Registry;

/// A problem found in one action, before it is pinned to a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ValidationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// State validators may consult: the run's registry as the script left it.
pub struct ValidationContext<'a> {
    pub registry: &'a Registry,
}

impl<'a> ValidationContext<'a> {
    /// Actions dispatched before `action` in this run, oldest first. Empty
    /// when `action` is not part of the run's log.
    pub fn earlier_actions(&self, action: &Action) -> Vec<&'a Action> {
        let log: Vec<&'a Action> = self.registry.actions().iter().collect();
        log.iter()
            .position(|a| std::ptr::eq(*a, action))
            .map(|i| log[..i].to_vec())
            .unwrap_or_default()
    }
}

pub trait Validator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Action tags this validator is a candidate for.
    fn tags(&self) -> &'static [ActionTag];

    fn is_applicable(&self, action: &Action) -> bool {
        self.tags().contains(&action.tag())
    }

    fn validate(&self, action: &Action, ctx: &ValidationContext<'_>) -> Vec<ValidationError>;
}

// ---------------------------------------------------------------------------
// ValidatorChain
// ---------------------------------------------------------------------------

pub struct ValidatorChain {
    validators: Vec<Box<dyn Validator>>,
    /// Candidate validator indices per tag, in registration order.
    by_tag: HashMap<ActionTag, Vec<usize>>,
}

impl Default for ValidatorChain {
    fn default() -> Self {
        Self::new(default_validators())
    }
}

impl ValidatorChain {
    pub fn new(validators: Vec<Box<dyn Validator>>) -> Self {
        let mut chain = Self {
            validators: Vec::new(),
            by_tag: HashMap::new(),
        };
        for v in validators {
            chain.register(v);
        }
        chain
    }

    pub fn register(&mut self, validator: Box<dyn Validator>) {
        let index = self.validators.len();
        for tag in validator.tags() {
            self.by_tag.entry(*tag).or_default().push(index);
        }
        self.validators.push(validator);
    }

    /// The single validator responsible for `action`, if any.
    pub fn validator_for(&self, action: &Action) -> Option<&dyn Validator> {
        self.by_tag
            .get(&action.tag())?
            .iter()
            .map(|&i| self.validators[i].as_ref())
            .find(|v| v.is_applicable(action))
    }

    pub fn validate(&self, action: &Action, ctx: &ValidationContext<'_>) -> Vec<Diagnostic> {
        let Some(validator) = self.validator_for(action) else {
            return Vec::new();
        };
        validator
            .validate(action, ctx)
            .into_iter()
            .map(|e| Diagnostic::at(&action.location, e.kind, e.message))
            .collect()
    }

    /// Validate every action the run dispatched, in dispatch order.
    pub fn validate_all(&self, registry: &Registry) -> Vec<Diagnostic> {
        let ctx = ValidationContext { registry };
        registry
            .actions()
            .iter()
            .flat_map(|action| self.validate(action, &ctx))
            .collect()
    }
}

pub fn default_validators() -> Vec<Box<dyn Validator>> {
    vec![
        Box::new(ContentTypeValidator),
        Box::new(FieldLocationValidator),
        Box::new(MoveTargetValidator),
        Box::new(FieldChangeValidator),
        Box::new(ApiErrorValidator),
        Box::new(ScriptErrorValidator),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, SourceLocation};

    struct Always(&'static str, bool);

    impl Validator for Always {
        fn name(&self) -> &'static str {
            self.0
        }

        fn tags(&self) -> &'static [ActionTag] {
            &[ActionTag::AddTask]
        }

        fn is_applicable(&self, _action: &Action) -> bool {
            self.1
        }

        fn validate(&self, _action: &Action, _ctx: &ValidationContext<'_>) -> Vec<ValidationError> {
            vec![ValidationError::new(ErrorKind::Script, self.0)]
        }
    }

    struct Silent;

    impl Validator for Silent {
        fn name(&self) -> &'static str {
            "silent"
        }

        fn tags(&self) -> &'static [ActionTag] {
            &[ActionTag::AddTask]
        }

        fn validate(&self, _action: &Action, _ctx: &ValidationContext<'_>) -> Vec<ValidationError> {
            Vec::new()
        }
    }

    fn add_task() -> Action {
        Action::new(
            ActionKind::AddTask {
                title: "seed".into(),
            },
            SourceLocation::new("m.rs", 5),
        )
    }

    #[test]
    fn first_applicable_validator_wins() {
        let chain = ValidatorChain::new(vec![
            Box::new(Always("skipped", false)),
            Box::new(Always("chosen", true)),
            Box::new(Always("shadowed", true)),
        ]);
        let registry = Registry::default();
        let ctx = ValidationContext {
            registry: &registry,
        };
        let diags = chain.validate(&add_task(), &ctx);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "chosen");
        assert_eq!(diags[0].line, 5);
    }

    #[test]
    fn silent_match_still_stops_the_chain() {
        let chain = ValidatorChain::new(vec![Box::new(Silent), Box::new(Always("later", true))]);
        let registry = Registry::default();
        let ctx = ValidationContext {
            registry: &registry,
        };
        assert_eq!(chain.validator_for(&add_task()).unwrap().name(), "silent");
        assert!(chain.validate(&add_task(), &ctx).is_empty());
    }

    #[test]
    fn actions_without_validator_pass() {
        let chain = ValidatorChain::default();
        assert!(chain.validator_for(&add_task()).is_none());
    }
}
