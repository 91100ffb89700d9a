//! Entity store error types.

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the entity store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// No record with this id in the type's collection
    #[error("Entity '{id}' not found for type '{entity_type}'")]
    EntityNotFound { entity_type: String, id: Uuid },

    /// A write would violate a uniqueness rule
    #[error("Duplicate value for field '{field}' in type '{entity_type}'")]
    Duplicate {
        entity_type: String,
        field: String,
        value: Value,
    },

    /// A store lock was poisoned by a panicking writer
    #[error("Entity store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Build a not-found error.
    pub fn not_found(entity_type: impl Into<String>, id: Uuid) -> Self {
        StoreError::EntityNotFound {
            entity_type: entity_type.into(),
            id,
        }
    }
}
