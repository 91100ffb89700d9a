//! Real-time change feed for fixturedb.
//!
//! Every successful create/update/delete/consume/reset publishes an
//! `EntityEvent` to a broadcast channel with best-effort delivery. The
//! WebSocket endpoint in the REST layer streams the wire form to clients.

pub mod event;
pub mod notifier;

pub use event::{ChangeKind, EntityEvent};
pub use notifier::{ChangeNotifier, DEFAULT_CHANNEL_CAPACITY};
