//! Schema-domain error types.

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised by the schema registry and the entity validator.
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    /// A schema with this entity name is already registered
    #[error("Entity type '{0}' already exists")]
    DuplicateName(String),

    /// The schema definition itself is malformed
    #[error("Invalid schema definition: {0}")]
    InvalidDefinition(String),

    /// No schema registered under this entity name
    #[error("Entity type '{0}' not found")]
    UnknownType(String),

    /// A proposed field map violates the schema. The human-readable detail
    /// is carried separately so the caller-facing message stays stable.
    #[error("Entity does not match schema for type: {entity_type}")]
    EntityMismatch {
        entity_type: String,
        detail: String,
    },

    /// Filter requested on a field outside `filterableFields`
    #[error("Field '{field}' is not filterable for type '{entity_type}'")]
    NotFilterable {
        entity_type: String,
        field: String,
    },

    /// Reading or writing a schema definition file failed
    #[error("Schema persistence failed: {0}")]
    Persistence(String),
}

impl SchemaError {
    /// Build an entity/schema mismatch error.
    pub fn mismatch(entity_type: impl Into<String>, detail: impl Into<String>) -> Self {
        SchemaError::EntityMismatch {
            entity_type: entity_type.into(),
            detail: detail.into(),
        }
    }

    /// Returns the mismatch detail, if this is a mismatch error.
    pub fn detail(&self) -> Option<&str> {
        match self {
            SchemaError::EntityMismatch { detail, .. } => Some(detail),
            _ => None,
        }
    }
}
