//! Read specifications for selecting records
//!
//! A `TargetQuery` names a collection and a set of predicates with AND
//! semantics. Evaluation is strict: no type coercion, exact match only,
//! and a missing or null field never matches anything except `Missing`.

use serde_json::Value;

/// A filter condition on one field
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Field name in the record body
    pub field: String,
    /// Comparison to apply
    pub op: FilterOp,
}

impl Predicate {
    /// Creates a predicate on the given field
    pub fn new(field: impl Into<String>, op: FilterOp) -> Self {
        Self {
            field: field.into(),
            op,
        }
    }
}

/// Supported comparison operators
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Exact equality (no coercion)
    Eq(Value),
    /// Exact inequality; missing fields do not match
    Ne(Value),
    /// Greater than (numbers and strings)
    Gt(Value),
    /// Greater than or equal (numbers and strings)
    Gte(Value),
    /// Less than (numbers and strings)
    Lt(Value),
    /// Less than or equal (numbers and strings)
    Lte(Value),
    /// Case-insensitive substring match on string fields
    Contains(String),
    /// Field is absent or null
    Missing,
}

/// A read specification: which records a destructive or read-only
/// operation targets
#[derive(Debug, Clone, PartialEq)]
pub struct TargetQuery {
    /// Collection to read
    pub collection: String,
    /// Predicates, all of which must match
    pub predicates: Vec<Predicate>,
}

impl TargetQuery {
    /// Selects every record in a collection
    pub fn all(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            predicates: Vec::new(),
        }
    }

    /// Selects records matching the given predicates
    pub fn filtered(collection: impl Into<String>, predicates: Vec<Predicate>) -> Self {
        Self {
            collection: collection.into(),
            predicates,
        }
    }

    /// Adds a predicate
    pub fn with(mut self, field: impl Into<String>, op: FilterOp) -> Self {
        self.predicates.push(Predicate::new(field, op));
        self
    }

    /// Checks whether a record body matches all predicates
    pub fn matches(&self, body: &Value) -> bool {
        self.predicates.iter().all(|pred| matches_predicate(body, pred))
    }
}

/// Checks a single predicate against a record body
fn matches_predicate(body: &Value, predicate: &Predicate) -> bool {
    let field_value = body.get(&predicate.field);

    // Missing is the only operator a missing or null field can satisfy
    let present = match field_value {
        Some(v) if !v.is_null() => v,
        _ => return matches!(predicate.op, FilterOp::Missing),
    };

    match &predicate.op {
        FilterOp::Eq(expected) => present == expected,
        FilterOp::Ne(expected) => present != expected,
        FilterOp::Gt(bound) => ordered_cmp(present, bound, |o| o == std::cmp::Ordering::Greater),
        FilterOp::Gte(bound) => ordered_cmp(present, bound, |o| o != std::cmp::Ordering::Less),
        FilterOp::Lt(bound) => ordered_cmp(present, bound, |o| o == std::cmp::Ordering::Less),
        FilterOp::Lte(bound) => ordered_cmp(present, bound, |o| o != std::cmp::Ordering::Greater),
        FilterOp::Contains(needle) => match present {
            Value::String(s) => s.to_lowercase().contains(&needle.to_lowercase()),
            _ => false,
        },
        FilterOp::Missing => false,
    }
}

/// Ordered comparison for numbers and strings; any other type pairing
/// does not match
fn ordered_cmp<F>(actual: &Value, bound: &Value, accept: F) -> bool
where
    F: Fn(std::cmp::Ordering) -> bool,
{
    match (actual, bound) {
        (Value::Number(a), Value::Number(b)) => {
            match (a.as_f64(), b.as_f64()) {
                (Some(af), Some(bf)) => af
                    .partial_cmp(&bf)
                    .map(&accept)
                    .unwrap_or(false),
                _ => false,
            }
        }
        (Value::String(a), Value::String(b)) => accept(a.as_str().cmp(b.as_str())),
        _ => false,
    }
}
