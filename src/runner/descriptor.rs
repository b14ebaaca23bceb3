//! Operation descriptors
//!
//! A descriptor is the full specification of one destructive action:
//! which records it targets, what it does to each of them, and whether
//! the mutation is reversible. Reversibility is a structural field, not
//! a warning comment; callers and tests can check it.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::query::TargetQuery;
use crate::store::StoredRecord;

/// Why an action could not be applied to one record
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ActionError(pub String);

impl ActionError {
    /// Creates an action error
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// What an action decided for one record
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// Replace the record body with the mutated form
    Mutate(Value),
    /// Delete the record
    Delete,
    /// Leave the record unchanged (matched but nothing to repair)
    Keep,
}

type ActionFn = Box<dyn Fn(&StoredRecord) -> Result<ActionOutcome, ActionError>>;

/// Specification of one destructive operation.
///
/// Immutable once constructed; the runner only reads it.
pub struct OperationDescriptor {
    name: String,
    target: TargetQuery,
    reversible: bool,
    action: ActionFn,
}

impl OperationDescriptor {
    /// Creates a descriptor.
    ///
    /// `reversible` means the action's pre-image fully determines the
    /// prior state, so a rollback restores it exactly. Deletions and
    /// field mutations are reversible; anything with external side
    /// effects is not.
    pub fn new(
        name: impl Into<String>,
        target: TargetQuery,
        reversible: bool,
        action: impl Fn(&StoredRecord) -> Result<ActionOutcome, ActionError> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            target,
            reversible,
            action: Box::new(action),
        }
    }

    /// Operation name (shown in prompts, reports, and the ops log)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records the operation targets
    pub fn target(&self) -> &TargetQuery {
        &self.target
    }

    /// Whether a rollback restores prior state exactly
    pub fn reversible(&self) -> bool {
        self.reversible
    }

    /// Applies the action to one record
    pub fn apply(&self, record: &StoredRecord) -> Result<ActionOutcome, ActionError> {
        (self.action)(record)
    }
}

impl fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("reversible", &self.reversible)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_apply_runs_the_action() {
        let descriptor = OperationDescriptor::new(
            "deactivate",
            TargetQuery::all("users"),
            true,
            |record| {
                let mut body = record.body.clone();
                body["is_active"] = json!(false);
                Ok(ActionOutcome::Mutate(body))
            },
        );

        let record = StoredRecord::new("users", "u1", json!({"is_active": true}));
        let outcome = descriptor.apply(&record).unwrap();

        assert_eq!(outcome, ActionOutcome::Mutate(json!({"is_active": false})));
        assert!(descriptor.reversible());
    }

    #[test]
    fn test_action_failure_carries_reason() {
        let descriptor =
            OperationDescriptor::new("broken", TargetQuery::all("users"), true, |_| {
                Err(ActionError::new("no expiry field"))
            });

        let record = StoredRecord::new("users", "u1", json!({}));
        let err = descriptor.apply(&record).unwrap_err();
        assert_eq!(err.to_string(), "no expiry field");
    }
}
