//! Uniqueness conflict detection.
//!
//! Comparison is exact JSON equality: case-sensitive, whitespace-preserving,
//! no numeric coercion. Only records in the same environment scope are
//! compared, and only records that currently exist impose a constraint.
//!
//! The enforcer is a pure scan; the store invokes it inside its write lock
//! so a conflicting concurrent create cannot slip between check and write.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::store::EntityRecord;

use super::rules::UniqueRule;

/// A detected uniqueness violation.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    /// The offending field (joined names for a compound key)
    pub field: String,
    /// The offending value (a tuple array for a compound key)
    pub value: Value,
}

/// Stateless conflict detector.
pub struct UniquenessEnforcer;

impl UniquenessEnforcer {
    /// Scans existing records for a conflict with the candidate field map.
    ///
    /// `environment` is the candidate's scope tag; records in other scopes
    /// never conflict. `exclude` skips the record being updated so setting
    /// a field to its current value never conflicts with itself.
    pub fn find_conflict<'a, I>(
        rules: &[UniqueRule],
        candidate: &Map<String, Value>,
        environment: Option<&str>,
        existing: I,
        exclude: Option<Uuid>,
    ) -> Option<Conflict>
    where
        I: IntoIterator<Item = &'a EntityRecord>,
    {
        if rules.is_empty() {
            return None;
        }

        for record in existing {
            if Some(record.id) == exclude || !record.in_scope(environment) {
                continue;
            }

            for rule in rules {
                if let Some(conflict) = Self::check_rule(rule, candidate, record) {
                    return Some(conflict);
                }
            }
        }

        None
    }

    fn check_rule(
        rule: &UniqueRule,
        candidate: &Map<String, Value>,
        record: &EntityRecord,
    ) -> Option<Conflict> {
        match rule {
            UniqueRule::Field(name) => {
                let value = candidate.get(name)?;
                if record.fields.get(name) == Some(value) {
                    Some(Conflict {
                        field: name.clone(),
                        value: value.clone(),
                    })
                } else {
                    None
                }
            }
            UniqueRule::Compound(names) => {
                // The whole tuple must match; absent compares equal to absent.
                let tuple_matches = names
                    .iter()
                    .all(|name| candidate.get(name) == record.fields.get(name));
                if tuple_matches {
                    let tuple: Vec<Value> = names
                        .iter()
                        .map(|name| candidate.get(name).cloned().unwrap_or(Value::Null))
                        .collect();
                    Some(Conflict {
                        field: rule.describe(),
                        value: Value::Array(tuple),
                    })
                } else {
                    None
                }
            }
        }
    }
}
