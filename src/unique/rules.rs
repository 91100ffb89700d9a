//! Uniqueness rule derivation.
//!
//! A schema declares uniqueness two ways: per-field `isUnique` flags, and a
//! `uniqueFields` list that is either N independent rules or, with
//! `useCompoundUnique`, one compound key over the whole tuple.

use crate::schema::EntitySchema;

/// One uniqueness rule derived from a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniqueRule {
    /// A single field whose value must be unique within its scope
    Field(String),
    /// A tuple of fields whose joint value must be unique within its scope
    Compound(Vec<String>),
}

impl UniqueRule {
    /// Human-readable rule name, used in conflict reports.
    pub fn describe(&self) -> String {
        match self {
            UniqueRule::Field(name) => name.clone(),
            UniqueRule::Compound(names) => names.join("+"),
        }
    }
}

/// Derives the active uniqueness rules for a schema.
///
/// Fields flagged `isUnique` are always independent rules. The
/// `uniqueFields` list contributes independent rules too, unless
/// `useCompoundUnique` turns the whole list into one compound key.
pub fn rules_for(schema: &EntitySchema) -> Vec<UniqueRule> {
    let mut independent: Vec<String> = schema
        .fields
        .iter()
        .filter(|f| f.is_unique)
        .map(|f| f.name.clone())
        .collect();

    let mut rules = Vec::new();

    if schema.use_compound_unique {
        if !schema.unique_fields.is_empty() {
            rules.push(UniqueRule::Compound(schema.unique_fields.clone()));
        }
    } else {
        for name in &schema.unique_fields {
            if !independent.contains(name) {
                independent.push(name.clone());
            }
        }
    }

    rules.extend(independent.into_iter().map(UniqueRule::Field));
    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntitySchema, FieldDef, FieldType};

    fn base_schema() -> EntitySchema {
        EntitySchema::new(
            "agents",
            vec![
                FieldDef::unique("email", FieldType::String),
                FieldDef::required("brandId", FieldType::String),
                FieldDef::required("agentId", FieldType::String),
            ],
        )
    }

    #[test]
    fn test_is_unique_flag_derives_field_rule() {
        let rules = rules_for(&base_schema());
        assert_eq!(rules, vec![UniqueRule::Field("email".into())]);
    }

    #[test]
    fn test_unique_fields_independent_by_default() {
        let schema = base_schema().with_unique_fields(&["brandId", "agentId"], false);
        let rules = rules_for(&schema);
        assert!(rules.contains(&UniqueRule::Field("brandId".into())));
        assert!(rules.contains(&UniqueRule::Field("agentId".into())));
        assert!(rules.contains(&UniqueRule::Field("email".into())));
        assert_eq!(rules.len(), 3);
    }

    #[test]
    fn test_unique_fields_deduplicate_against_flags() {
        let schema = base_schema().with_unique_fields(&["email", "brandId"], false);
        let rules = rules_for(&schema);
        assert_eq!(
            rules.iter().filter(|r| **r == UniqueRule::Field("email".into())).count(),
            1
        );
    }

    #[test]
    fn test_compound_mode_forms_one_tuple_rule() {
        let schema = base_schema().with_unique_fields(&["brandId", "agentId"], true);
        let rules = rules_for(&schema);
        assert!(rules.contains(&UniqueRule::Compound(vec![
            "brandId".into(),
            "agentId".into()
        ])));
        // The isUnique flag still applies independently.
        assert!(rules.contains(&UniqueRule::Field("email".into())));
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_describe() {
        assert_eq!(UniqueRule::Field("email".into()).describe(), "email");
        assert_eq!(
            UniqueRule::Compound(vec!["a".into(), "b".into()]).describe(),
            "a+b"
        );
    }
}
