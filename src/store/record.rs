//! Entity record types.
//!
//! A record is one instance of a runtime-declared entity type: engine-owned
//! metadata plus the schema-shaped field map. All metadata is assigned by
//! the engine; callers never set ids, timestamps, or the consumed flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// One stored entity instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    /// Engine-assigned, immutable id
    pub id: Uuid,
    /// Owning entity type name (not a live foreign key)
    pub entity_type: String,
    /// Optional scope tag; absent means a global/unscoped record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Schema-shaped field map
    pub fields: Map<String, Value>,
    /// Consumption state; inert unless the schema enables it
    pub is_consumed: bool,
    /// Set once at creation
    pub created_at: DateTime<Utc>,
    /// Bumped on every mutation
    pub updated_at: DateTime<Utc>,
}

impl EntityRecord {
    /// Creates a fresh Available record with a new id.
    pub fn new(
        entity_type: impl Into<String>,
        fields: Map<String, Value>,
        environment: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            entity_type: entity_type.into(),
            environment,
            fields,
            is_consumed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this record passes an environment filter.
    ///
    /// An absent filter matches every record; a present filter requires an
    /// exact tag match.
    pub fn matches_environment(&self, filter: Option<&str>) -> bool {
        match filter {
            None => true,
            Some(env) => self.environment.as_deref() == Some(env),
        }
    }

    /// Whether this record shares a uniqueness scope with the given tag.
    ///
    /// Scopes compare by exact tag equality; the unscoped pool is its own
    /// scope.
    pub fn in_scope(&self, environment: Option<&str>) -> bool {
        self.environment.as_deref() == environment
    }

    /// Bumps the modification timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
