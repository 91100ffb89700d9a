//! Schema registry.
//!
//! The single source of truth for entity type definitions. Definitions are
//! held in memory behind a lock so the registry can be shared across request
//! handlers, and optionally persisted as one JSON file per type under
//! `<data_dir>/schemas/`, reloaded at boot.
//!
//! The registry owns definitions only. Deleting or replacing a definition
//! never touches stored entities of that type.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::Utc;

use crate::observability::Logger;

use super::errors::{SchemaError, SchemaResult};
use super::types::EntitySchema;

/// Registry of entity type definitions.
pub struct SchemaRegistry {
    /// Definitions indexed by entity name
    schemas: RwLock<HashMap<String, EntitySchema>>,
    /// Directory for persisted definitions; `None` keeps the registry
    /// memory-only (tests, embedded use)
    schema_dir: Option<PathBuf>,
}

impl SchemaRegistry {
    /// Creates a memory-only registry.
    pub fn in_memory() -> Self {
        Self {
            schemas: RwLock::new(HashMap::new()),
            schema_dir: None,
        }
    }

    /// Creates a disk-backed registry rooted at the given data directory.
    ///
    /// Definition files live at `<data_dir>/schemas/schema_<name>.json`.
    pub fn at(data_dir: &Path) -> Self {
        Self {
            schemas: RwLock::new(HashMap::new()),
            schema_dir: Some(data_dir.join("schemas")),
        }
    }

    /// Loads every persisted definition from disk. Returns the number
    /// loaded. A no-op for memory-only registries.
    pub fn load_all(&self) -> SchemaResult<usize> {
        let Some(dir) = &self.schema_dir else {
            return Ok(0);
        };

        if !dir.exists() {
            fs::create_dir_all(dir)
                .map_err(|e| SchemaError::Persistence(format!("create {}: {}", dir.display(), e)))?;
            return Ok(0);
        }

        let entries = fs::read_dir(dir)
            .map_err(|e| SchemaError::Persistence(format!("read {}: {}", dir.display(), e)))?;

        let mut loaded = 0;
        for entry in entries {
            let entry =
                entry.map_err(|e| SchemaError::Persistence(format!("read dir entry: {}", e)))?;
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }

            let content = fs::read_to_string(&path)
                .map_err(|e| SchemaError::Persistence(format!("read {}: {}", path.display(), e)))?;
            let schema: EntitySchema = serde_json::from_str(&content).map_err(|e| {
                SchemaError::Persistence(format!("parse {}: {}", path.display(), e))
            })?;
            schema.validate_structure()?;

            Logger::info(
                "SCHEMA_LOADED",
                &[("entity_type", schema.entity_name.as_str())],
            );
            self.write_lock()?.insert(schema.entity_name.clone(), schema);
            loaded += 1;
        }

        Ok(loaded)
    }

    /// Registers a new definition.
    ///
    /// Fails if the name is already taken or the definition is malformed.
    /// Timestamps are assigned here, never taken from the caller.
    pub fn create(&self, mut schema: EntitySchema) -> SchemaResult<EntitySchema> {
        schema.validate_structure()?;
        check_name(&schema.entity_name)?;

        let now = Utc::now();
        schema.created_at = now;
        schema.updated_at = now;

        {
            let mut schemas = self.write_lock()?;
            if schemas.contains_key(&schema.entity_name) {
                return Err(SchemaError::DuplicateName(schema.entity_name));
            }
            schemas.insert(schema.entity_name.clone(), schema.clone());
        }

        if let Err(e) = self.persist(&schema) {
            // Roll the insert back so a failed write is not observable.
            let _ = self.write_lock().map(|mut s| s.remove(&schema.entity_name));
            return Err(e);
        }

        Ok(schema)
    }

    /// Replaces an existing definition in place.
    ///
    /// `createdAt` is preserved from the old definition; existing entities
    /// of the type are not touched.
    pub fn update(&self, entity_name: &str, mut schema: EntitySchema) -> SchemaResult<EntitySchema> {
        schema.entity_name = entity_name.to_string();
        schema.validate_structure()?;

        {
            let mut schemas = self.write_lock()?;
            let previous = schemas
                .get(entity_name)
                .ok_or_else(|| SchemaError::UnknownType(entity_name.to_string()))?;

            schema.created_at = previous.created_at;
            schema.updated_at = Utc::now();
            schemas.insert(entity_name.to_string(), schema.clone());
        }

        self.persist(&schema)?;
        Ok(schema)
    }

    /// Returns a definition by entity name.
    pub fn get(&self, entity_name: &str) -> SchemaResult<EntitySchema> {
        self.read_lock()?
            .get(entity_name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownType(entity_name.to_string()))
    }

    /// Removes a definition. Entities of the type are retained but become
    /// unreachable until the name is registered again.
    pub fn delete(&self, entity_name: &str) -> SchemaResult<()> {
        let removed = self.write_lock()?.remove(entity_name);
        if removed.is_none() {
            return Err(SchemaError::UnknownType(entity_name.to_string()));
        }

        if let Some(dir) = &self.schema_dir {
            let path = dir.join(file_name(entity_name));
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    SchemaError::Persistence(format!("remove {}: {}", path.display(), e))
                })?;
            }
        }

        Ok(())
    }

    /// Returns all definitions, sorted by entity name.
    pub fn list(&self) -> SchemaResult<Vec<EntitySchema>> {
        let mut all: Vec<_> = self.read_lock()?.values().cloned().collect();
        all.sort_by(|a, b| a.entity_name.cmp(&b.entity_name));
        Ok(all)
    }

    /// Whether a definition exists for this name.
    pub fn exists(&self, entity_name: &str) -> bool {
        self.read_lock()
            .map(|s| s.contains_key(entity_name))
            .unwrap_or(false)
    }

    fn persist(&self, schema: &EntitySchema) -> SchemaResult<()> {
        let Some(dir) = &self.schema_dir else {
            return Ok(());
        };

        if !dir.exists() {
            fs::create_dir_all(dir)
                .map_err(|e| SchemaError::Persistence(format!("create {}: {}", dir.display(), e)))?;
        }

        let path = dir.join(file_name(&schema.entity_name));
        let content = serde_json::to_string_pretty(schema)
            .map_err(|e| SchemaError::Persistence(format!("serialize schema: {}", e)))?;
        fs::write(&path, content)
            .map_err(|e| SchemaError::Persistence(format!("write {}: {}", path.display(), e)))?;

        Ok(())
    }

    fn read_lock(
        &self,
    ) -> SchemaResult<std::sync::RwLockReadGuard<'_, HashMap<String, EntitySchema>>> {
        self.schemas
            .read()
            .map_err(|_| SchemaError::Persistence("schema registry lock poisoned".into()))
    }

    fn write_lock(
        &self,
    ) -> SchemaResult<std::sync::RwLockWriteGuard<'_, HashMap<String, EntitySchema>>> {
        self.schemas
            .write()
            .map_err(|_| SchemaError::Persistence("schema registry lock poisoned".into()))
    }
}

fn file_name(entity_name: &str) -> String {
    format!("schema_{}.json", entity_name)
}

/// Entity names become file names and URL path segments.
fn check_name(name: &str) -> SchemaResult<()> {
    let ok = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(SchemaError::InvalidDefinition(format!(
            "entityName '{}' may only contain alphanumerics, '-', '_' and '.'",
            name
        )))
    }
}
