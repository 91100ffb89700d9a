//! Consumption error types.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for consumption operations
pub type ConsumptionResult<T> = Result<T, ConsumptionError>;

/// Errors raised by the consumption coordinator.
#[derive(Debug, Clone, Error)]
pub enum ConsumptionError {
    /// `fetch_next` invoked on a type without `excludeOnFetch`
    #[error("Consumption is not enabled for type '{0}'")]
    NotEnabled(String),

    /// No Available record matched the fetch
    #[error("No available entity for type '{entity_type}'{}", scope_suffix(.environment))]
    NoneAvailable {
        entity_type: String,
        environment: Option<String>,
    },

    /// Underlying store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn scope_suffix(environment: &Option<String>) -> String {
    match environment {
        Some(env) => format!(" in environment '{}'", env),
        None => String::new(),
    }
}
