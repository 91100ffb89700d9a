//! Entity validation against a schema.
//!
//! The validator shapes a proposed field map before any write is attempted:
//! - every `required` field must be present and non-null;
//! - values are coerced best-effort toward the declared type (numbers and
//!   booleans stringify for string fields, numeric strings parse for number
//!   fields, dates accept RFC 3339 strings or epoch milliseconds);
//! - keys not declared in the schema are silently dropped, never stored.
//!
//! Validation never mutates its inputs and is deterministic.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use super::errors::{SchemaError, SchemaResult};
use super::types::{EntitySchema, FieldDef, FieldType};

/// Stateless validator for entity field maps.
pub struct EntityValidator;

impl EntityValidator {
    /// Validates a field map for entity creation.
    ///
    /// Returns the normalized map: declared fields only, values coerced to
    /// their declared types.
    pub fn validate_create(
        schema: &EntitySchema,
        fields: &Map<String, Value>,
    ) -> SchemaResult<Map<String, Value>> {
        Self::shape(schema, fields)
    }

    /// Validates a patch for entity update.
    ///
    /// The patch is merged over the stored map (an explicit null removes the
    /// key), and the merged result must still satisfy the schema, so a patch
    /// that nulls out a required field is rejected.
    pub fn validate_update(
        schema: &EntitySchema,
        existing: &Map<String, Value>,
        patch: &Map<String, Value>,
    ) -> SchemaResult<Map<String, Value>> {
        let mut merged = existing.clone();
        for (key, value) in patch {
            if value.is_null() {
                merged.remove(key);
            } else {
                merged.insert(key.clone(), value.clone());
            }
        }
        Self::shape(schema, &merged)
    }

    /// Checks that a field may be used in the filter operation.
    pub fn check_filterable(schema: &EntitySchema, field: &str) -> SchemaResult<()> {
        if schema.is_filterable(field) {
            Ok(())
        } else {
            Err(SchemaError::NotFilterable {
                entity_type: schema.entity_name.clone(),
                field: field.to_string(),
            })
        }
    }

    /// Shapes a raw map into a schema-conformant one.
    fn shape(schema: &EntitySchema, raw: &Map<String, Value>) -> SchemaResult<Map<String, Value>> {
        let mut shaped = Map::new();

        for field in &schema.fields {
            match raw.get(&field.name) {
                Some(value) if !value.is_null() => {
                    let coerced = Self::coerce(field, value).map_err(|detail| {
                        SchemaError::mismatch(&schema.entity_name, detail)
                    })?;
                    shaped.insert(field.name.clone(), coerced);
                }
                _ => {
                    if field.required {
                        return Err(SchemaError::mismatch(
                            &schema.entity_name,
                            format!("required field '{}' is missing or null", field.name),
                        ));
                    }
                }
            }
        }

        Ok(shaped)
    }

    /// Coerces a value toward the declared field type.
    fn coerce(field: &FieldDef, value: &Value) -> Result<Value, String> {
        match field.field_type {
            FieldType::String => match value {
                Value::String(_) => Ok(value.clone()),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                other => Err(type_detail(field, other)),
            },
            FieldType::Number => match value {
                Value::Number(_) => Ok(value.clone()),
                Value::String(s) => {
                    if let Ok(i) = s.trim().parse::<i64>() {
                        Ok(Value::from(i))
                    } else if let Ok(f) = s.trim().parse::<f64>() {
                        serde_json::Number::from_f64(f)
                            .map(Value::Number)
                            .ok_or_else(|| type_detail(field, value))
                    } else {
                        Err(type_detail(field, value))
                    }
                }
                other => Err(type_detail(field, other)),
            },
            FieldType::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::String(s) => match s.trim() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    _ => Err(type_detail(field, value)),
                },
                other => Err(type_detail(field, other)),
            },
            FieldType::Date => match value {
                Value::String(s) => {
                    DateTime::parse_from_rfc3339(s)
                        .map(|_| value.clone())
                        .map_err(|_| {
                            format!(
                                "field '{}': expected an RFC 3339 date, got '{}'",
                                field.name, s
                            )
                        })
                }
                Value::Number(n) => {
                    let millis = n.as_i64().ok_or_else(|| type_detail(field, value))?;
                    match Utc.timestamp_millis_opt(millis).single() {
                        Some(ts) => Ok(Value::String(ts.to_rfc3339())),
                        None => Err(type_detail(field, value)),
                    }
                }
                other => Err(type_detail(field, other)),
            },
            FieldType::Array => match value {
                Value::Array(_) => Ok(value.clone()),
                other => Err(type_detail(field, other)),
            },
            FieldType::Object => match value {
                Value::Object(_) => Ok(value.clone()),
                other => Err(type_detail(field, other)),
            },
        }
    }
}

fn type_detail(field: &FieldDef, actual: &Value) -> String {
    format!(
        "field '{}': expected {}, got {}",
        field.name,
        field.field_type.type_name(),
        json_type_name(actual)
    )
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
