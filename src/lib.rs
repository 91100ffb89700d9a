//! fixturedb - A self-hostable dynamic entity service for test-data pools
//!
//! Callers declare entity types at runtime (fields, required/unique flags),
//! then create, query, and consume instances of those types. Consumption is
//! atomic: concurrently running test workers never receive the same fixture
//! twice.

pub mod cli;
pub mod consumption;
pub mod engine;
pub mod observability;
pub mod realtime;
pub mod rest_api;
pub mod schema;
pub mod store;
pub mod unique;
