//! Entity schema type definitions.
//!
//! A schema declares the shape of one entity type at runtime: an ordered
//! field list with required/unique flags, the subset of fields that may be
//! filtered on, the uniqueness mode, and whether fetches consume records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::errors::{SchemaError, SchemaResult};

/// Declared field value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// Integer or floating point number
    Number,
    /// Boolean
    Boolean,
    /// RFC 3339 timestamp string (epoch milliseconds accepted on input)
    Date,
    /// JSON array
    Array,
    /// Nested JSON object
    Object,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }
}

/// One declared field of an entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    /// Field name, unique within the schema
    pub name: String,
    /// Declared value type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the field must be present and non-null
    #[serde(default)]
    pub required: bool,
    /// Whether the field is independently unique
    #[serde(default)]
    pub is_unique: bool,
    /// Optional human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDef {
    /// Create a plain optional field
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            is_unique: false,
            description: None,
        }
    }

    /// Create a required field
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            required: true,
            ..Self::new(name, field_type)
        }
    }

    /// Create a required, independently unique field
    pub fn unique(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            required: true,
            is_unique: true,
            ..Self::new(name, field_type)
        }
    }
}

/// Complete declaration of one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySchema {
    /// Globally unique, immutable identifier for the type
    pub entity_name: String,
    /// Ordered field declarations
    pub fields: Vec<FieldDef>,
    /// Field names queryable via the filter operation
    #[serde(default)]
    pub filterable_fields: Vec<String>,
    /// Field names participating in compound uniqueness
    #[serde(default)]
    pub unique_fields: Vec<String>,
    /// Treat `unique_fields` as one compound key instead of N independent ones
    #[serde(default)]
    pub use_compound_unique: bool,
    /// Enable the consumption state machine for this type
    #[serde(default)]
    pub exclude_on_fetch: bool,
    /// Set by the registry on create
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Set by the registry on create and update
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl EntitySchema {
    /// Create a schema with the given name and fields; everything else off.
    pub fn new(entity_name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        let now = Utc::now();
        Self {
            entity_name: entity_name.into(),
            fields,
            filterable_fields: Vec::new(),
            unique_fields: Vec::new(),
            use_compound_unique: false,
            exclude_on_fetch: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style: set the filterable field names.
    pub fn with_filterable(mut self, names: &[&str]) -> Self {
        self.filterable_fields = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Builder-style: set the compound/independent unique field names.
    pub fn with_unique_fields(mut self, names: &[&str], compound: bool) -> Self {
        self.unique_fields = names.iter().map(|s| s.to_string()).collect();
        self.use_compound_unique = compound;
        self
    }

    /// Builder-style: enable consume-on-fetch.
    pub fn with_exclude_on_fetch(mut self) -> Self {
        self.exclude_on_fetch = true;
        self
    }

    /// Look up a field declaration by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether a field is declared filterable.
    pub fn is_filterable(&self, name: &str) -> bool {
        self.filterable_fields.iter().any(|f| f == name)
    }

    /// Validates the schema declaration itself (not an entity).
    ///
    /// Checks: non-empty name, at least one field, no repeated field names,
    /// `uniqueFields`/`filterableFields` reference declared fields only, and
    /// compound mode has a non-empty key.
    pub fn validate_structure(&self) -> SchemaResult<()> {
        if self.entity_name.trim().is_empty() {
            return Err(SchemaError::InvalidDefinition(
                "entityName must not be empty".into(),
            ));
        }

        if self.fields.is_empty() {
            return Err(SchemaError::InvalidDefinition(
                "schema must declare at least one field".into(),
            ));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(SchemaError::InvalidDefinition(
                    "field names must not be empty".into(),
                ));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::InvalidDefinition(format!(
                    "duplicate field name '{}'",
                    field.name
                )));
            }
        }

        for name in &self.unique_fields {
            if !seen.contains(name.as_str()) {
                return Err(SchemaError::InvalidDefinition(format!(
                    "uniqueFields references undeclared field '{}'",
                    name
                )));
            }
        }

        for name in &self.filterable_fields {
            if !seen.contains(name.as_str()) {
                return Err(SchemaError::InvalidDefinition(format!(
                    "filterableFields references undeclared field '{}'",
                    name
                )));
            }
        }

        if self.use_compound_unique && self.unique_fields.is_empty() {
            return Err(SchemaError::InvalidDefinition(
                "useCompoundUnique requires a non-empty uniqueFields".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> EntitySchema {
        EntitySchema::new(
            "user-pool",
            vec![
                FieldDef::unique("email", FieldType::String),
                FieldDef::required("name", FieldType::String),
                FieldDef::new("age", FieldType::Number),
            ],
        )
        .with_filterable(&["email", "name"])
    }

    #[test]
    fn test_valid_schema_structure() {
        assert!(sample_schema().validate_structure().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut schema = sample_schema();
        schema.entity_name = "  ".into();
        assert!(schema.validate_structure().is_err());
    }

    #[test]
    fn test_duplicate_field_names_rejected() {
        let schema = EntitySchema::new(
            "dup",
            vec![
                FieldDef::new("a", FieldType::String),
                FieldDef::new("a", FieldType::Number),
            ],
        );
        let err = schema.validate_structure().unwrap_err();
        assert!(err.to_string().contains("duplicate field name"));
    }

    #[test]
    fn test_unique_fields_must_be_declared() {
        let schema = sample_schema().with_unique_fields(&["ghost"], false);
        let err = schema.validate_structure().unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_filterable_fields_must_be_declared() {
        let mut schema = sample_schema();
        schema.filterable_fields.push("ghost".into());
        assert!(schema.validate_structure().is_err());
    }

    #[test]
    fn test_compound_requires_key_members() {
        let mut schema = sample_schema();
        schema.use_compound_unique = true;
        assert!(schema.validate_structure().is_err());

        let schema = sample_schema().with_unique_fields(&["email", "name"], true);
        assert!(schema.validate_structure().is_ok());
    }

    #[test]
    fn test_camel_case_wire_form() {
        let schema = sample_schema().with_unique_fields(&["email"], false);
        let json = serde_json::to_value(&schema).unwrap();
        assert!(json.get("entityName").is_some());
        assert!(json.get("filterableFields").is_some());
        assert!(json.get("useCompoundUnique").is_some());
        assert!(json.get("excludeOnFetch").is_some());
        assert_eq!(json["fields"][0]["isUnique"], true);
        assert_eq!(json["fields"][0]["type"], "string");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let schema: EntitySchema = serde_json::from_str(
            r#"{
                "entityName": "agents",
                "fields": [
                    {"name": "brandId", "type": "string", "required": true},
                    {"name": "agentId", "type": "string", "required": true}
                ],
                "uniqueFields": ["brandId", "agentId"],
                "useCompoundUnique": true
            }"#,
        )
        .unwrap();

        assert_eq!(schema.entity_name, "agents");
        assert!(schema.use_compound_unique);
        assert!(!schema.exclude_on_fetch);
        assert!(schema.filterable_fields.is_empty());
        assert!(schema.validate_structure().is_ok());
    }

    #[test]
    fn test_field_lookup() {
        let schema = sample_schema();
        assert_eq!(schema.field("email").unwrap().field_type, FieldType::String);
        assert!(schema.field("missing").is_none());
        assert!(schema.is_filterable("email"));
        assert!(!schema.is_filterable("age"));
    }
}
