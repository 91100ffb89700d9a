//! Engine error taxonomy.
//!
//! Every failure maps to one of four classes, surfaced verbatim to the
//! caller and never retried internally: validation (the request is wrong),
//! not-found (the target does not exist or nothing is available), conflict
//! (a uniqueness rule was violated), and internal (the engine itself broke).

use serde_json::Value;
use thiserror::Error;

use crate::consumption::ConsumptionError;
use crate::schema::SchemaError;
use crate::store::StoreError;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Classification of an engine failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed request; deterministic, caller must change the input
    Validation,
    /// Target absent, or no Available record remains
    NotFound,
    /// Uniqueness violation; caller input required to resolve
    Conflict,
    /// Engine-side failure
    Internal,
}

/// Unified error for the engine's operation surface.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Schema registry / validator failure
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Entity store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Consumption state machine failure
    #[error(transparent)]
    Consumption(ConsumptionError),
}

impl From<ConsumptionError> for EngineError {
    fn from(err: ConsumptionError) -> Self {
        // Flatten the store layer so classification has one place per error.
        match err {
            ConsumptionError::Store(inner) => EngineError::Store(inner),
            other => EngineError::Consumption(other),
        }
    }
}

impl EngineError {
    /// Classifies this error for transport mapping.
    pub fn class(&self) -> ErrorClass {
        match self {
            EngineError::Schema(err) => match err {
                SchemaError::DuplicateName(_)
                | SchemaError::InvalidDefinition(_)
                | SchemaError::EntityMismatch { .. }
                | SchemaError::NotFilterable { .. } => ErrorClass::Validation,
                SchemaError::UnknownType(_) => ErrorClass::NotFound,
                SchemaError::Persistence(_) => ErrorClass::Internal,
            },
            EngineError::Store(err) => match err {
                StoreError::EntityNotFound { .. } => ErrorClass::NotFound,
                StoreError::Duplicate { .. } => ErrorClass::Conflict,
                StoreError::LockPoisoned => ErrorClass::Internal,
            },
            EngineError::Consumption(err) => match err {
                ConsumptionError::NotEnabled(_) => ErrorClass::Validation,
                ConsumptionError::NoneAvailable { .. } => ErrorClass::NotFound,
                ConsumptionError::Store(_) => ErrorClass::Internal,
            },
        }
    }

    /// The offending (field, value) pair for conflict errors.
    pub fn duplicate_parts(&self) -> Option<(&str, &Value)> {
        match self {
            EngineError::Store(StoreError::Duplicate { field, value, .. }) => {
                Some((field.as_str(), value))
            }
            _ => None,
        }
    }
}
