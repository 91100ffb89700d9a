//! Observability for fixturedb.
//!
//! Structured single-line JSON logging with explicit severities. Logging is
//! synchronous, has no background threads, and never influences the outcome
//! of the operation being logged.

mod logger;

pub use logger::{Level, Logger};
