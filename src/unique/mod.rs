//! Uniqueness enforcement for fixturedb.
//!
//! Rules are derived from the schema (independent fields plus an optional
//! compound key) and checked inside the store's write path, so detection is
//! race-free under concurrent creates.

mod enforcer;
mod rules;

pub use enforcer::{Conflict, UniquenessEnforcer};
pub use rules::{rules_for, UniqueRule};
