//! Consumption state machine.
//!
//! For types with `excludeOnFetch`, every record is either **Available**
//! (initial, on create) or **Consumed** (after a fetch, until reset).
//! Consumed records are invisible to fetches and listings, which is what
//! lets concurrently running test workers draw from one pool without ever
//! receiving the same fixture twice.
//!
//! Every transition here is a single `find_one_and_update` against the
//! store — never a read followed by a write.

use std::sync::Arc;
use uuid::Uuid;

use crate::schema::EntitySchema;
use crate::store::{EntityRecord, EntityStore, StoreError};

use super::errors::{ConsumptionError, ConsumptionResult};

/// Coordinates Available→Consumed transitions on the store.
pub struct ConsumptionCoordinator {
    store: Arc<EntityStore>,
}

impl ConsumptionCoordinator {
    /// Creates a coordinator over the given store.
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }

    /// Atomically claims one arbitrary Available record and returns it,
    /// already flipped to Consumed.
    ///
    /// Selection order among candidates is unspecified. Fails without
    /// mutating anything when the type has consumption disabled or no
    /// Available record matches the environment filter.
    pub fn fetch_next(
        &self,
        schema: &EntitySchema,
        environment: Option<&str>,
    ) -> ConsumptionResult<EntityRecord> {
        if !schema.exclude_on_fetch {
            return Err(ConsumptionError::NotEnabled(schema.entity_name.clone()));
        }

        self.store
            .find_one_and_update(
                &schema.entity_name,
                |r| !r.is_consumed && r.matches_environment(environment),
                |r| {
                    r.is_consumed = true;
                    r.touch();
                },
            )?
            .ok_or_else(|| ConsumptionError::NoneAvailable {
                entity_type: schema.entity_name.clone(),
                environment: environment.map(String::from),
            })
    }

    /// Consume-on-read: atomically flips a specific Available record to
    /// Consumed and returns it.
    ///
    /// A record that is already Consumed is invisible through this path
    /// until reset, so the caller sees the same not-found as for an unknown
    /// id. Only meaningful for types with consumption enabled; plain reads
    /// go straight to the store.
    pub fn consume_by_id(
        &self,
        schema: &EntitySchema,
        id: Uuid,
    ) -> ConsumptionResult<EntityRecord> {
        self.store
            .find_one_and_update(
                &schema.entity_name,
                |r| r.id == id && !r.is_consumed,
                |r| {
                    r.is_consumed = true;
                    r.touch();
                },
            )?
            .ok_or_else(|| {
                ConsumptionError::Store(StoreError::not_found(&schema.entity_name, id))
            })
    }

    /// Returns one record to the Available pool.
    ///
    /// Fails only if the record does not exist; resetting an Available
    /// record is a successful no-op. The returned flag tells whether a
    /// transition actually happened.
    pub fn reset(&self, entity_type: &str, id: Uuid) -> ConsumptionResult<bool> {
        let mut was_consumed = false;
        let record = self.store.find_one_and_update(
            entity_type,
            |r| r.id == id,
            |r| {
                was_consumed = r.is_consumed;
                if r.is_consumed {
                    r.is_consumed = false;
                    r.touch();
                }
            },
        )?;

        match record {
            Some(_) => Ok(was_consumed),
            None => Err(ConsumptionError::Store(StoreError::not_found(
                entity_type,
                id,
            ))),
        }
    }

    /// Returns every matching Consumed record to the Available pool,
    /// optionally scoped by environment. Returns the count reset.
    pub fn reset_all(
        &self,
        entity_type: &str,
        environment: Option<&str>,
    ) -> ConsumptionResult<usize> {
        let count = self.store.update_all_where(
            entity_type,
            |r| r.is_consumed && r.matches_environment(environment),
            |r| {
                r.is_consumed = false;
                r.touch();
            },
        )?;
        Ok(count)
    }
}
