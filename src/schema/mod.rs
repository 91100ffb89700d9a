//! Entity type declarations for fixturedb.
//!
//! Schemas are declared at runtime and are the source of truth for which
//! fields exist, which are required, which are unique, and whether fetches
//! consume records.
//!
//! # Design Principles
//!
//! - Schema shape is validated on every registry write
//! - Entity validation happens before any store write
//! - Validation is deterministic and never mutates its input

mod errors;
mod registry;
mod types;
mod validator;

pub use errors::{SchemaError, SchemaResult};
pub use registry::SchemaRegistry;
pub use types::{EntitySchema, FieldDef, FieldType};
pub use validator::EntityValidator;
