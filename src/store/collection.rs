//! In-process entity store.
//!
//! One collection per entity type, all behind a single lock. The write lock
//! is the store's serialization point: uniqueness checks run inside the
//! same critical section as the write they guard, and the
//! `find_one_and_update` primitive applies its predicate and mutation
//! without any read/write gap. Either a write fully succeeds or nothing is
//! inserted.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::unique::{UniqueRule, UniquenessEnforcer};

use super::errors::{StoreError, StoreResult};
use super::record::EntityRecord;

/// Records of one entity type.
#[derive(Debug, Default)]
struct Collection {
    records: HashMap<Uuid, EntityRecord>,
}

/// Entity store: per-type collections with uniqueness-checked writes and an
/// atomic conditional-update primitive.
#[derive(Debug, Default)]
pub struct EntityStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl EntityStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, enforcing the given uniqueness rules atomically.
    pub fn insert(&self, record: EntityRecord, rules: &[UniqueRule]) -> StoreResult<EntityRecord> {
        let mut collections = self.write_lock()?;
        let collection = collections
            .entry(record.entity_type.clone())
            .or_default();

        if let Some(conflict) = UniquenessEnforcer::find_conflict(
            rules,
            &record.fields,
            record.environment.as_deref(),
            collection.records.values(),
            None,
        ) {
            return Err(StoreError::Duplicate {
                entity_type: record.entity_type,
                field: conflict.field,
                value: conflict.value,
            });
        }

        collection.records.insert(record.id, record.clone());
        Ok(record)
    }

    /// Returns a record by id.
    pub fn get(&self, entity_type: &str, id: Uuid) -> StoreResult<EntityRecord> {
        self.read_lock()?
            .get(entity_type)
            .and_then(|c| c.records.get(&id))
            .cloned()
            .ok_or_else(|| StoreError::not_found(entity_type, id))
    }

    /// Replaces a record's field map, enforcing uniqueness rules atomically.
    ///
    /// The record itself is excluded from the conflict check, so writing a
    /// field's current value back never conflicts. Metadata other than
    /// `updatedAt` is untouched.
    pub fn replace_fields(
        &self,
        entity_type: &str,
        id: Uuid,
        fields: Map<String, Value>,
        rules: &[UniqueRule],
    ) -> StoreResult<EntityRecord> {
        let mut collections = self.write_lock()?;
        let collection = collections
            .get_mut(entity_type)
            .ok_or_else(|| StoreError::not_found(entity_type, id))?;

        let environment = collection
            .records
            .get(&id)
            .ok_or_else(|| StoreError::not_found(entity_type, id))?
            .environment
            .clone();

        if let Some(conflict) = UniquenessEnforcer::find_conflict(
            rules,
            &fields,
            environment.as_deref(),
            collection.records.values(),
            Some(id),
        ) {
            return Err(StoreError::Duplicate {
                entity_type: entity_type.to_string(),
                field: conflict.field,
                value: conflict.value,
            });
        }

        let record = collection
            .records
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(entity_type, id))?;
        record.fields = fields;
        record.touch();
        Ok(record.clone())
    }

    /// Removes a record, returning it.
    pub fn remove(&self, entity_type: &str, id: Uuid) -> StoreResult<EntityRecord> {
        self.write_lock()?
            .get_mut(entity_type)
            .and_then(|c| c.records.remove(&id))
            .ok_or_else(|| StoreError::not_found(entity_type, id))
    }

    /// Returns every record of a type matching the predicate.
    ///
    /// An unknown type yields an empty list; the caller decides whether the
    /// type itself exists.
    pub fn scan<P>(&self, entity_type: &str, predicate: P) -> StoreResult<Vec<EntityRecord>>
    where
        P: Fn(&EntityRecord) -> bool,
    {
        Ok(self
            .read_lock()?
            .get(entity_type)
            .map(|c| {
                c.records
                    .values()
                    .filter(|r| predicate(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Atomically finds one record matching the predicate, applies the
    /// mutation, and returns the mutated record.
    ///
    /// Selection among multiple matches is arbitrary. Returns `None`
    /// without mutating anything when no record matches. This runs entirely
    /// under the write lock; there is no gap between match and mutation for
    /// a concurrent caller to slip into.
    pub fn find_one_and_update<P, M>(
        &self,
        entity_type: &str,
        predicate: P,
        mutate: M,
    ) -> StoreResult<Option<EntityRecord>>
    where
        P: Fn(&EntityRecord) -> bool,
        M: FnOnce(&mut EntityRecord),
    {
        let mut collections = self.write_lock()?;
        let Some(collection) = collections.get_mut(entity_type) else {
            return Ok(None);
        };

        let id = collection
            .records
            .values()
            .find(|r| predicate(r))
            .map(|r| r.id);

        match id {
            Some(id) => {
                let record = collection.records.get_mut(&id).expect("id just matched");
                mutate(record);
                Ok(Some(record.clone()))
            }
            None => Ok(None),
        }
    }

    /// Atomically applies the mutation to every record matching the
    /// predicate, returning how many were mutated.
    pub fn update_all_where<P, M>(
        &self,
        entity_type: &str,
        predicate: P,
        mutate: M,
    ) -> StoreResult<usize>
    where
        P: Fn(&EntityRecord) -> bool,
        M: Fn(&mut EntityRecord),
    {
        let mut collections = self.write_lock()?;
        let Some(collection) = collections.get_mut(entity_type) else {
            return Ok(0);
        };

        let mut count = 0;
        for record in collection.records.values_mut() {
            if predicate(record) {
                mutate(record);
                count += 1;
            }
        }
        Ok(count)
    }

    /// Number of records stored for a type.
    pub fn count(&self, entity_type: &str) -> usize {
        self.read_lock()
            .map(|c| c.get(entity_type).map(|c| c.records.len()).unwrap_or(0))
            .unwrap_or(0)
    }

    fn read_lock(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<String, Collection>>> {
        self.collections.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write_lock(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<String, Collection>>> {
        self.collections.write().map_err(|_| StoreError::LockPoisoned)
    }
}
