//! End-to-End Engine Scenarios
//!
//! Full lifecycle walks through the engine facade: fixture pool
//! consumption, case-sensitive uniqueness, compound keys, schema
//! replacement, and schema persistence across restarts.

use fixturedb::engine::{EntityEngine, ErrorClass};
use fixturedb::realtime::{ChangeKind, ChangeNotifier};
use fixturedb::schema::{EntitySchema, FieldDef, FieldType};
use serde_json::{json, Map, Value};
use tempfile::TempDir;

fn fields(value: Value) -> Map<String, Value> {
    value.as_object().unwrap().clone()
}

/// A fixture pool over its whole life: create, claim, exhaust, reset,
/// claim again.
#[test]
fn test_fixture_pool_lifecycle() {
    let engine = EntityEngine::in_memory();
    engine
        .create_schema(
            EntitySchema::new(
                "user-pool",
                vec![FieldDef::unique("email", FieldType::String)],
            )
            .with_exclude_on_fetch(),
        )
        .unwrap();

    let created = engine
        .create_entity("user-pool", &fields(json!({"email": "a@x.com"})), None)
        .unwrap();
    assert!(!created.is_consumed);

    let claimed = engine.fetch_next("user-pool", None).unwrap();
    assert_eq!(claimed.id, created.id);
    assert!(claimed.is_consumed);

    let err = engine.fetch_next("user-pool", None).unwrap_err();
    assert_eq!(err.class(), ErrorClass::NotFound);

    let reset_count = engine.reset_all("user-pool", None).unwrap();
    assert_eq!(reset_count, 1);

    let reclaimed = engine.fetch_next("user-pool", None).unwrap();
    assert_eq!(reclaimed.id, created.id);
}

/// Case-sensitive uniqueness: "Bob" and "bob" coexist.
#[test]
fn test_case_sensitive_usernames() {
    let engine = EntityEngine::in_memory();
    engine
        .create_schema(
            EntitySchema::new(
                "members",
                vec![FieldDef::required("username", FieldType::String)],
            )
            .with_unique_fields(&["username"], false),
        )
        .unwrap();

    engine
        .create_entity("members", &fields(json!({"username": "Bob"})), None)
        .unwrap();
    engine
        .create_entity("members", &fields(json!({"username": "bob"})), None)
        .unwrap();
}

/// Compound key over {brandId, agentId}: a partial overlap is fine, the
/// full tuple is not.
#[test]
fn test_compound_key_scenario() {
    let engine = EntityEngine::in_memory();
    engine
        .create_schema(
            EntitySchema::new(
                "brand-agents",
                vec![
                    FieldDef::required("brandId", FieldType::String),
                    FieldDef::required("agentId", FieldType::String),
                ],
            )
            .with_unique_fields(&["brandId", "agentId"], true),
        )
        .unwrap();

    engine
        .create_entity(
            "brand-agents",
            &fields(json!({"brandId": "B1", "agentId": "A1"})),
            None,
        )
        .unwrap();
    engine
        .create_entity(
            "brand-agents",
            &fields(json!({"brandId": "B1", "agentId": "A2"})),
            None,
        )
        .unwrap();

    let err = engine
        .create_entity(
            "brand-agents",
            &fields(json!({"brandId": "B1", "agentId": "A1"})),
            None,
        )
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Conflict);
}

/// Filtering works on declared filterable fields, excludes consumed
/// records, and scopes by environment.
#[test]
fn test_filtered_listing() {
    let engine = EntityEngine::in_memory();
    engine
        .create_schema(
            EntitySchema::new(
                "user-pool",
                vec![
                    FieldDef::unique("email", FieldType::String),
                    FieldDef::new("role", FieldType::String),
                ],
            )
            .with_filterable(&["role"])
            .with_exclude_on_fetch(),
        )
        .unwrap();

    let mut ids = std::collections::HashMap::new();
    for (email, role, env) in [
        ("a@x.com", "admin", Some("qa")),
        ("b@x.com", "admin", Some("dev")),
        ("c@x.com", "viewer", Some("qa")),
    ] {
        let record = engine
            .create_entity(
                "user-pool",
                &fields(json!({"email": email, "role": role})),
                env.map(String::from),
            )
            .unwrap();
        ids.insert(email, record.id);
    }

    let admins = engine
        .list_entities("user-pool", Some(("role", &json!("admin"))), None)
        .unwrap();
    assert_eq!(admins.len(), 2);

    let qa_admins = engine
        .list_entities("user-pool", Some(("role", &json!("admin"))), Some("qa"))
        .unwrap();
    assert_eq!(qa_admins.len(), 1);
    assert_eq!(qa_admins[0].fields["email"], "a@x.com");

    // Claiming the qa admin removes it from the listing.
    engine.get_by_id("user-pool", ids["a@x.com"]).unwrap();
    let qa_after = engine
        .list_entities("user-pool", Some(("role", &json!("admin"))), Some("qa"))
        .unwrap();
    assert!(qa_after.is_empty());
}

/// Schema replacement applies to subsequent writes only; stored records
/// are returned as-is.
#[test]
fn test_schema_update_does_not_migrate_records() {
    let engine = EntityEngine::in_memory();
    engine
        .create_schema(EntitySchema::new(
            "accounts",
            vec![
                FieldDef::required("email", FieldType::String),
                FieldDef::new("nickname", FieldType::String),
            ],
        ))
        .unwrap();

    let record = engine
        .create_entity(
            "accounts",
            &fields(json!({"email": "a@x.com", "nickname": "A"})),
            None,
        )
        .unwrap();

    // Drop the nickname field from the declaration.
    engine
        .update_schema(
            "accounts",
            EntitySchema::new(
                "accounts",
                vec![FieldDef::required("email", FieldType::String)],
            ),
        )
        .unwrap();

    // The stored record still carries its old field.
    let read = engine.get_by_id("accounts", record.id).unwrap();
    assert_eq!(read.fields["nickname"], "A");

    // A write under the new schema drops the now-undeclared key.
    let updated = engine
        .update_entity("accounts", record.id, &fields(json!({"email": "b@x.com"})))
        .unwrap();
    assert!(!updated.fields.contains_key("nickname"));
}

/// Missing required fields fail creation no matter how many other fields
/// are valid.
#[test]
fn test_missing_required_field_rejected() {
    let engine = EntityEngine::in_memory();
    engine
        .create_schema(EntitySchema::new(
            "accounts",
            vec![
                FieldDef::required("email", FieldType::String),
                FieldDef::new("a", FieldType::String),
                FieldDef::new("b", FieldType::Number),
                FieldDef::new("c", FieldType::Boolean),
            ],
        ))
        .unwrap();

    let err = engine
        .create_entity(
            "accounts",
            &fields(json!({"a": "ok", "b": 2, "c": true})),
            None,
        )
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Validation);
    assert_eq!(
        err.to_string(),
        "Entity does not match schema for type: accounts"
    );
}

/// Schema definitions survive a restart; records do not (the store is the
/// external collaborator), so the pool starts empty but typed.
#[test]
fn test_schema_definitions_survive_restart() {
    let temp = TempDir::new().unwrap();

    {
        let engine =
            EntityEngine::with_data_dir(temp.path(), ChangeNotifier::default()).unwrap();
        engine
            .create_schema(
                EntitySchema::new(
                    "user-pool",
                    vec![FieldDef::unique("email", FieldType::String)],
                )
                .with_exclude_on_fetch(),
            )
            .unwrap();
    }

    let engine = EntityEngine::with_data_dir(temp.path(), ChangeNotifier::default()).unwrap();
    let schema = engine.get_schema("user-pool").unwrap();
    assert!(schema.exclude_on_fetch);

    // The reloaded type is immediately usable.
    engine
        .create_entity("user-pool", &fields(json!({"email": "a@x.com"})), None)
        .unwrap();
    assert!(engine.fetch_next("user-pool", None).is_ok());
}

/// The change feed reports the full lifecycle in order.
#[test]
fn test_change_feed_reports_lifecycle() {
    let engine = EntityEngine::in_memory();
    let mut rx = engine.notifier().subscribe();

    engine
        .create_schema(
            EntitySchema::new(
                "user-pool",
                vec![FieldDef::unique("email", FieldType::String)],
            )
            .with_exclude_on_fetch(),
        )
        .unwrap();

    let record = engine
        .create_entity("user-pool", &fields(json!({"email": "a@x.com"})), None)
        .unwrap();
    engine
        .update_entity("user-pool", record.id, &fields(json!({"email": "b@x.com"})))
        .unwrap();
    engine.fetch_next("user-pool", None).unwrap();
    engine.reset_all("user-pool", None).unwrap();
    engine.delete_entity("user-pool", record.id).unwrap();

    let kinds: Vec<ChangeKind> = std::iter::from_fn(|| rx.try_recv().ok())
        .map(|e| e.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            ChangeKind::Created,
            ChangeKind::Updated,
            ChangeKind::Consumed,
            ChangeKind::Reset,
            ChangeKind::Deleted,
        ]
    );
}
