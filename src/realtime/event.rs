//! Entity change events.
//!
//! One event per successful mutating operation, tagged with a monotonic
//! sequence number assigned at publish time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of entity change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    /// New record created
    Created,
    /// Field map updated
    Updated,
    /// Record deleted
    Deleted,
    /// Record claimed (Available → Consumed)
    Consumed,
    /// Record returned to the pool (Consumed → Available)
    Reset,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Created => write!(f, "CREATED"),
            ChangeKind::Updated => write!(f, "UPDATED"),
            ChangeKind::Deleted => write!(f, "DELETED"),
            ChangeKind::Consumed => write!(f, "CONSUMED"),
            ChangeKind::Reset => write!(f, "RESET"),
        }
    }
}

/// A change to one entity record (or, for bulk resets, to a pool).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityEvent {
    /// Monotonically increasing publish sequence
    pub sequence: u64,

    /// What happened
    pub kind: ChangeKind,

    /// Entity type name
    pub entity_type: String,

    /// Affected record id; absent for bulk resets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<Uuid>,

    /// Environment tag of the affected record(s)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// Snapshot of the record after the change (for CREATED/UPDATED/CONSUMED)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// When the event was published
    pub timestamp: DateTime<Utc>,
}

impl EntityEvent {
    /// Create an event; the sequence is stamped by the notifier.
    pub fn new(
        kind: ChangeKind,
        entity_type: impl Into<String>,
        entity_id: Option<Uuid>,
        environment: Option<String>,
        data: Option<Value>,
    ) -> Self {
        Self {
            sequence: 0,
            kind,
            entity_type: entity_type.into(),
            entity_id,
            environment,
            data,
            timestamp: Utc::now(),
        }
    }

    /// Topic string for subscription filtering
    pub fn topic(&self) -> String {
        format!("entities:{}", self.entity_type)
    }

    /// Serialize to the wire format sent to WebSocket clients
    pub fn to_wire_format(&self) -> Value {
        serde_json::json!({
            "type": "entity_change",
            "payload": {
                "sequence": self.sequence,
                "event": self.kind.to_string(),
                "entityType": self.entity_type,
                "entityId": self.entity_id,
                "environment": self.environment,
                "data": self.data,
                "timestamp": self.timestamp.to_rfc3339(),
            }
        })
    }
}
