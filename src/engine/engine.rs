//! Entity engine facade.
//!
//! Wires the schema registry, entity validator, uniqueness enforcer, store,
//! and consumption coordinator into the full operation surface, and
//! publishes a change event for every successful mutation. The engine is
//! stateless per request: all shared state lives in the registry and the
//! store.

use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::consumption::ConsumptionCoordinator;
use crate::realtime::{ChangeKind, ChangeNotifier, EntityEvent};
use crate::schema::{EntitySchema, EntityValidator, SchemaRegistry};
use crate::store::{EntityRecord, EntityStore};
use crate::unique::rules_for;

use super::errors::EngineResult;

/// The dynamic entity engine.
pub struct EntityEngine {
    schemas: SchemaRegistry,
    store: Arc<EntityStore>,
    coordinator: ConsumptionCoordinator,
    notifier: ChangeNotifier,
}

impl EntityEngine {
    /// Creates an engine over the given registry and notifier.
    pub fn new(schemas: SchemaRegistry, notifier: ChangeNotifier) -> Self {
        let store = Arc::new(EntityStore::new());
        let coordinator = ConsumptionCoordinator::new(store.clone());
        Self {
            schemas,
            store,
            coordinator,
            notifier,
        }
    }

    /// Creates a fully in-memory engine (tests, embedded use).
    pub fn in_memory() -> Self {
        Self::new(SchemaRegistry::in_memory(), ChangeNotifier::default())
    }

    /// Creates an engine with schema definitions persisted under the data
    /// directory, loading any existing definitions.
    pub fn with_data_dir(data_dir: &Path, notifier: ChangeNotifier) -> EngineResult<Self> {
        let schemas = SchemaRegistry::at(data_dir);
        schemas.load_all()?;
        Ok(Self::new(schemas, notifier))
    }

    /// The engine's change notifier (for subscribing to the event feed).
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    // ==================
    // Schema operations
    // ==================

    /// Registers a new entity type.
    pub fn create_schema(&self, schema: EntitySchema) -> EngineResult<EntitySchema> {
        Ok(self.schemas.create(schema)?)
    }

    /// Replaces an entity type definition in place. Existing records are
    /// not migrated; the new definition applies to subsequent writes.
    pub fn update_schema(
        &self,
        entity_name: &str,
        schema: EntitySchema,
    ) -> EngineResult<EntitySchema> {
        Ok(self.schemas.update(entity_name, schema)?)
    }

    /// Returns an entity type definition.
    pub fn get_schema(&self, entity_name: &str) -> EngineResult<EntitySchema> {
        Ok(self.schemas.get(entity_name)?)
    }

    /// Returns all definitions, sorted by name.
    pub fn list_schemas(&self) -> EngineResult<Vec<EntitySchema>> {
        Ok(self.schemas.list()?)
    }

    /// Removes an entity type definition. Records of the type are retained
    /// but unreachable until the name is registered again.
    pub fn delete_schema(&self, entity_name: &str) -> EngineResult<()> {
        Ok(self.schemas.delete(entity_name)?)
    }

    // ==================
    // Entity operations
    // ==================

    /// Validates and stores a new record.
    ///
    /// The field map is shaped against the schema (unknown keys dropped,
    /// values coerced) and uniqueness rules are enforced atomically with
    /// the insert; a rejected create writes nothing.
    pub fn create_entity(
        &self,
        entity_type: &str,
        fields: &Map<String, Value>,
        environment: Option<String>,
    ) -> EngineResult<EntityRecord> {
        let schema = self.schemas.get(entity_type)?;
        let shaped = EntityValidator::validate_create(&schema, fields)?;
        let record = EntityRecord::new(entity_type, shaped, environment);

        let stored = self.store.insert(record, &rules_for(&schema))?;
        self.publish(ChangeKind::Created, &stored);
        Ok(stored)
    }

    /// Merges a patch over a record's field map.
    ///
    /// The merged map must still satisfy the schema; the record is excluded
    /// from its own uniqueness check. `isConsumed` never changes here.
    pub fn update_entity(
        &self,
        entity_type: &str,
        id: Uuid,
        patch: &Map<String, Value>,
    ) -> EngineResult<EntityRecord> {
        let schema = self.schemas.get(entity_type)?;
        let existing = self.store.get(entity_type, id)?;
        let merged = EntityValidator::validate_update(&schema, &existing.fields, patch)?;

        let updated = self
            .store
            .replace_fields(entity_type, id, merged, &rules_for(&schema))?;
        self.publish(ChangeKind::Updated, &updated);
        Ok(updated)
    }

    /// Deletes a record. Its unique values become immediately reusable.
    pub fn delete_entity(&self, entity_type: &str, id: Uuid) -> EngineResult<()> {
        self.schemas.get(entity_type)?;
        let removed = self.store.remove(entity_type, id)?;
        self.publish(ChangeKind::Deleted, &removed);
        Ok(())
    }

    /// Returns a record by id.
    ///
    /// For types with consumption enabled this is consume-on-read: an
    /// Available record is atomically flipped to Consumed before being
    /// returned, and a Consumed record is invisible (not-found) until
    /// reset. For other types this is a pure read.
    pub fn get_by_id(&self, entity_type: &str, id: Uuid) -> EngineResult<EntityRecord> {
        let schema = self.schemas.get(entity_type)?;

        if schema.exclude_on_fetch {
            let consumed = self.coordinator.consume_by_id(&schema, id)?;
            self.publish(ChangeKind::Consumed, &consumed);
            Ok(consumed)
        } else {
            Ok(self.store.get(entity_type, id)?)
        }
    }

    /// Lists records of a type, optionally filtered by one field/value pair
    /// and by environment.
    ///
    /// Filtering is only permitted on `filterableFields`. For types with
    /// consumption enabled, Consumed records are silently excluded; this is
    /// read-only and never a state transition.
    pub fn list_entities(
        &self,
        entity_type: &str,
        filter: Option<(&str, &Value)>,
        environment: Option<&str>,
    ) -> EngineResult<Vec<EntityRecord>> {
        let schema = self.schemas.get(entity_type)?;

        if let Some((field, _)) = filter {
            EntityValidator::check_filterable(&schema, field)?;
        }

        let hide_consumed = schema.exclude_on_fetch;
        let records = self.store.scan(entity_type, |record| {
            if hide_consumed && record.is_consumed {
                return false;
            }
            if !record.matches_environment(environment) {
                return false;
            }
            match filter {
                Some((field, value)) => record.fields.get(field) == Some(value),
                None => true,
            }
        })?;
        Ok(records)
    }

    /// Atomically claims one arbitrary Available record of the type,
    /// returning it already Consumed.
    pub fn fetch_next(
        &self,
        entity_type: &str,
        environment: Option<&str>,
    ) -> EngineResult<EntityRecord> {
        let schema = self.schemas.get(entity_type)?;
        let claimed = self.coordinator.fetch_next(&schema, environment)?;
        self.publish(ChangeKind::Consumed, &claimed);
        Ok(claimed)
    }

    /// Returns one record to the Available pool.
    pub fn reset(&self, entity_type: &str, id: Uuid) -> EngineResult<()> {
        self.schemas.get(entity_type)?;
        let transitioned = self.coordinator.reset(entity_type, id)?;

        if transitioned {
            if let Ok(record) = self.store.get(entity_type, id) {
                self.publish(ChangeKind::Reset, &record);
            }
        }
        Ok(())
    }

    /// Returns every matching Consumed record to the Available pool,
    /// optionally scoped by environment. Returns the count reset.
    pub fn reset_all(
        &self,
        entity_type: &str,
        environment: Option<&str>,
    ) -> EngineResult<usize> {
        self.schemas.get(entity_type)?;
        let count = self.coordinator.reset_all(entity_type, environment)?;

        if count > 0 {
            self.notifier.publish(EntityEvent::new(
                ChangeKind::Reset,
                entity_type,
                None,
                environment.map(String::from),
                Some(serde_json::json!({ "resetCount": count })),
            ));
        }
        Ok(count)
    }

    fn publish(&self, kind: ChangeKind, record: &EntityRecord) {
        let data = serde_json::to_value(record).ok();
        self.notifier.publish(EntityEvent::new(
            kind,
            record.entity_type.clone(),
            Some(record.id),
            record.environment.clone(),
            data,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::errors::ErrorClass;
    use crate::schema::{FieldDef, FieldType};
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    fn pool_schema() -> EntitySchema {
        EntitySchema::new(
            "user-pool",
            vec![FieldDef::unique("email", FieldType::String)],
        )
        .with_filterable(&["email"])
        .with_exclude_on_fetch()
    }

    #[test]
    fn test_create_requires_known_type() {
        let engine = EntityEngine::in_memory();
        let err = engine
            .create_entity("ghost", &fields(json!({"email": "a@x.com"})), None)
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::NotFound);
    }

    #[test]
    fn test_create_and_duplicate_conflict() {
        let engine = EntityEngine::in_memory();
        engine.create_schema(pool_schema()).unwrap();

        let created = engine
            .create_entity("user-pool", &fields(json!({"email": "a@x.com"})), None)
            .unwrap();
        assert!(!created.is_consumed);

        let err = engine
            .create_entity("user-pool", &fields(json!({"email": "a@x.com"})), None)
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Conflict);
        assert_eq!(err.duplicate_parts().unwrap().0, "email");
    }

    #[test]
    fn test_get_by_id_consumes_when_enabled() {
        let engine = EntityEngine::in_memory();
        engine.create_schema(pool_schema()).unwrap();
        let created = engine
            .create_entity("user-pool", &fields(json!({"email": "a@x.com"})), None)
            .unwrap();

        let first = engine.get_by_id("user-pool", created.id).unwrap();
        assert!(first.is_consumed);

        let err = engine.get_by_id("user-pool", created.id).unwrap_err();
        assert_eq!(err.class(), ErrorClass::NotFound);
    }

    #[test]
    fn test_get_by_id_pure_read_when_disabled() {
        let engine = EntityEngine::in_memory();
        engine
            .create_schema(EntitySchema::new(
                "accounts",
                vec![FieldDef::required("email", FieldType::String)],
            ))
            .unwrap();
        let created = engine
            .create_entity("accounts", &fields(json!({"email": "a@x.com"})), None)
            .unwrap();

        for _ in 0..2 {
            let read = engine.get_by_id("accounts", created.id).unwrap();
            assert!(!read.is_consumed);
        }
    }

    #[test]
    fn test_filter_gate() {
        let engine = EntityEngine::in_memory();
        engine.create_schema(pool_schema()).unwrap();

        let err = engine
            .list_entities("user-pool", Some(("isConsumed", &json!(true))), None)
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Validation);
    }

    #[test]
    fn test_update_never_changes_consumed() {
        let engine = EntityEngine::in_memory();
        engine.create_schema(pool_schema()).unwrap();
        let created = engine
            .create_entity("user-pool", &fields(json!({"email": "a@x.com"})), None)
            .unwrap();
        engine.fetch_next("user-pool", None).unwrap();

        let updated = engine
            .update_entity("user-pool", created.id, &fields(json!({"email": "b@x.com"})))
            .unwrap();
        assert!(updated.is_consumed);
    }

    #[test]
    fn test_events_published_for_mutations() {
        let engine = EntityEngine::in_memory();
        let mut rx = engine.notifier().subscribe();
        engine.create_schema(pool_schema()).unwrap();

        let created = engine
            .create_entity("user-pool", &fields(json!({"email": "a@x.com"})), None)
            .unwrap();
        engine.fetch_next("user-pool", None).unwrap();
        engine.reset("user-pool", created.id).unwrap();

        assert_eq!(rx.try_recv().unwrap().kind, ChangeKind::Created);
        assert_eq!(rx.try_recv().unwrap().kind, ChangeKind::Consumed);
        assert_eq!(rx.try_recv().unwrap().kind, ChangeKind::Reset);
    }

    #[test]
    fn test_deleted_schema_makes_records_unreachable() {
        let engine = EntityEngine::in_memory();
        engine.create_schema(pool_schema()).unwrap();
        let created = engine
            .create_entity("user-pool", &fields(json!({"email": "a@x.com"})), None)
            .unwrap();

        engine.delete_schema("user-pool").unwrap();
        let err = engine.get_by_id("user-pool", created.id).unwrap_err();
        assert_eq!(err.class(), ErrorClass::NotFound);

        // Re-registering the name re-exposes the records.
        engine.create_schema(pool_schema()).unwrap();
        assert!(engine.get_by_id("user-pool", created.id).is_ok());
    }
}
