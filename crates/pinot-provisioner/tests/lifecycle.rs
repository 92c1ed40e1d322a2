mod common;

use common::{full_manifest, manifest, schema_decl, start, table_decl, user_decl};
use pinot_provisioner::{
    build_syncers, destroy, preview, provision, refresh, Action, Cause, ProvisionerError,
    ResourceAddr, ResourceKind,
};
use serde_json::json;

fn table_addr() -> ResourceAddr {
    ResourceAddr::new(ResourceKind::Table, "events_REALTIME")
}

fn user_addr() -> ResourceAddr {
    ResourceAddr::new(ResourceKind::User, "alice|BROKER")
}

#[tokio::test]
async fn first_apply_creates_in_dependency_order() {
    let h = start().await;

    let report = provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();

    assert_eq!(report.created.len(), 3);
    assert!(report.warnings.is_empty());
    assert_eq!(h.mock.writes(), ["POST /schemas", "POST /tables", "POST /users"]);

    let state = h.persistence.load().await.unwrap();
    assert_eq!(state.resources.len(), 3);
    assert!(state.controller.starts_with("http://127.0.0.1"));
}

#[tokio::test]
async fn credential_reaches_controller_but_not_state() {
    let h = start().await;
    provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();

    let submitted = h.mock.with(|c| c.tables["events_REALTIME"].clone());
    let jaas = submitted["ingestionConfig"]["streamIngestionConfig"]["streamConfigMaps"][0]
        ["sasl.jaas.config"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(jaas.contains(r#"username="svc""#));
    assert!(jaas.contains(r#"password="hunter2""#));

    let state = h.persistence.load().await.unwrap();
    let table = state.get(&table_addr()).unwrap();
    assert!(!table.properties.to_string().contains("sasl.jaas.config"));
    assert_eq!(table.secret.as_deref(), Some(jaas.as_str()));
    assert_eq!(
        table.properties["ingestionConfig"]["streamIngestionConfig"]["streamConfigMaps"][0]
            ["stream.kafka.topic.name"],
        "events"
    );
}

#[tokio::test]
async fn user_password_is_sent_once_and_kept_locally() {
    let h = start().await;
    provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();

    assert_eq!(h.mock.with(|c| c.passwords["alice_BROKER"].clone()), "s3cret");

    let state = h.persistence.load().await.unwrap();
    let user = state.get(&user_addr()).unwrap();
    assert!(user.properties.get("password").is_none());
    assert_eq!(user.properties["role"], "USER");
    assert_eq!(user.secret.as_deref(), Some("s3cret"));
}

#[tokio::test]
async fn second_apply_is_a_no_op() {
    let h = start().await;
    provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();
    h.mock.clear_requests();

    let report = provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();

    assert!(report.created.is_empty());
    assert!(report.modified.is_empty());
    assert!(report.deleted.is_empty());
    assert!(h.mock.writes().is_empty());
}

#[tokio::test]
async fn table_drift_is_updated_and_segments_reloaded() {
    let h = start().await;
    provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();
    h.mock.with(|c| {
        c.tables.get_mut("events_REALTIME").unwrap()["segmentsConfig"]["replication"] = json!("3");
    });
    h.mock.clear_requests();

    let entries = preview(&full_manifest(), &h.client, &h.persistence).await.unwrap();
    let table = entries.iter().find(|e| e.spec.addr() == table_addr()).unwrap();
    assert_eq!(table.action, Action::Modify);
    assert_eq!(table.cause, Cause::Drift);
    assert_eq!(table.drift.len(), 1);
    assert_eq!(table.drift[0].field, "segmentsConfig");

    let report = provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();

    assert_eq!(report.modified, [table_addr()]);
    assert!(report.warnings.is_empty());
    assert_eq!(
        h.mock.writes(),
        [
            "PUT /tables/events_REALTIME",
            "POST /segments/events/reload?type=REALTIME"
        ]
    );
    let updated = h.mock.with(|c| c.tables["events_REALTIME"].clone());
    assert_eq!(updated["segmentsConfig"]["replication"], "1");
    assert!(updated.to_string().contains("sasl.jaas.config"));
}

#[tokio::test]
async fn removed_table_key_is_reconciled() {
    let h = start().await;
    let mut with_quota = table_decl();
    with_quota["table_config"]["quota"] = json!({"storage": "10G"});
    let before = manifest(vec![schema_decl()], vec![with_quota], vec![user_decl()]);
    provision(&before, &h.client, &h.persistence).await.unwrap();
    assert_eq!(h.mock.with(|c| c.tables["events_REALTIME"]["quota"].clone()), json!({"storage": "10G"}));
    h.mock.clear_requests();

    let entries = preview(&full_manifest(), &h.client, &h.persistence).await.unwrap();
    let table = entries.iter().find(|e| e.spec.addr() == table_addr()).unwrap();
    assert_eq!(table.action, Action::Modify);
    assert_eq!(table.cause, Cause::Drift);
    assert_eq!(table.drift.len(), 1);
    assert_eq!(table.drift[0].field, "quota");
    assert_eq!(table.drift[0].expected, json!(null));

    let report = provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();

    assert_eq!(report.modified, [table_addr()]);
    assert_eq!(
        h.mock.writes(),
        [
            "PUT /tables/events_REALTIME",
            "POST /segments/events/reload?type=REALTIME"
        ]
    );
    assert!(h.mock.with(|c| c.tables["events_REALTIME"].get("quota").is_none()));

    h.mock.clear_requests();
    let report = provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();
    assert!(report.modified.is_empty());
    assert!(h.mock.writes().is_empty());
}

#[tokio::test]
async fn controller_defaults_are_not_drift() {
    let h = start().await;
    provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();
    h.mock.with(|c| {
        let table = c.tables.get_mut("events_REALTIME").unwrap();
        table["metadata"] = json!({"customConfigs": {}});
        table["segmentsConfig"]["retentionTimeUnit"] = json!("DAYS");
    });
    let syncers = build_syncers(&full_manifest(), &h.client).unwrap();
    let mut state = h.persistence.load().await.unwrap();
    refresh(&syncers, &h.client, &mut state, &h.persistence).await.unwrap();
    assert_eq!(state.get(&table_addr()).unwrap().properties["metadata"], json!({"customConfigs": {}}));
    h.mock.clear_requests();

    let entries = preview(&full_manifest(), &h.client, &h.persistence).await.unwrap();
    assert!(entries.iter().all(|e| e.action == Action::Ok));

    let report = provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();
    assert!(report.modified.is_empty());
    assert!(h.mock.writes().is_empty());
}

#[tokio::test]
async fn user_role_change_is_drift() {
    let h = start().await;
    provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();
    h.mock.with(|c| {
        c.users.get_mut("alice_BROKER").unwrap()["role"] = json!("ADMIN");
    });
    h.mock.clear_requests();

    let entries = preview(&full_manifest(), &h.client, &h.persistence).await.unwrap();
    let user = entries.iter().find(|e| e.spec.addr() == user_addr()).unwrap();
    assert_eq!(user.action, Action::Modify);
    assert_eq!(user.drift.len(), 1);
    assert_eq!(user.drift[0].field, "role");
    assert_eq!(user.drift[0].expected, "USER");
    assert_eq!(user.drift[0].actual, "ADMIN");

    let report = provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();
    assert_eq!(report.modified, [user_addr()]);
    assert_eq!(
        h.mock.writes(),
        ["PUT /users/alice?component=BROKER&componentType=BROKER"]
    );
}

#[tokio::test]
async fn reload_failure_is_a_warning() {
    let h = start().await;
    provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();
    h.mock.with(|c| {
        c.tables.get_mut("events_REALTIME").unwrap()["segmentsConfig"]["replication"] = json!("3");
    });
    h.mock.fail("POST /segments/events/reload");

    let report = provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();

    assert_eq!(report.modified, [table_addr()]);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("segment reload failed"));
    assert!(report.warnings[0].contains("injected failure"));
}

#[tokio::test]
async fn changed_kafka_credentials_are_drift() {
    let h = start().await;
    provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();

    let mut table = table_decl();
    table["kafka_password"] = json!("rotated");
    let rotated = manifest(vec![schema_decl()], vec![table], vec![user_decl()]);

    let report = provision(&rotated, &h.client, &h.persistence).await.unwrap();

    assert_eq!(report.modified, [table_addr()]);
    let state = h.persistence.load().await.unwrap();
    assert!(state.secret(&table_addr()).unwrap().contains(r#"password="rotated""#));
}

#[tokio::test]
async fn remotely_deleted_resource_is_recreated() {
    let h = start().await;
    provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();
    h.mock.with(|c| c.tables.clear());
    h.mock.clear_requests();

    let report = provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();

    assert_eq!(report.created, [table_addr()]);
    assert_eq!(h.mock.writes(), ["POST /tables"]);
}

#[tokio::test]
async fn refresh_drops_absent_and_keeps_secrets() {
    let h = start().await;
    let manifest = full_manifest();
    provision(&manifest, &h.client, &h.persistence).await.unwrap();
    h.mock.with(|c| {
        c.schemas.clear();
        c.users.get_mut("alice_BROKER").unwrap()["role"] = json!("ADMIN");
    });

    let syncers = build_syncers(&manifest, &h.client).unwrap();
    let mut state = h.persistence.load().await.unwrap();
    refresh(&syncers, &h.client, &mut state, &h.persistence).await.unwrap();

    assert!(state.get(&ResourceAddr::new(ResourceKind::Schema, "events")).is_none());
    let user = state.get(&user_addr()).unwrap();
    assert_eq!(user.properties["role"], "ADMIN");
    assert_eq!(user.secret.as_deref(), Some("s3cret"));

    let persisted = h.persistence.load().await.unwrap();
    assert_eq!(persisted.resources.len(), 2);
}

#[tokio::test]
async fn read_failure_leaves_state_untouched() {
    let h = start().await;
    let manifest = full_manifest();
    provision(&manifest, &h.client, &h.persistence).await.unwrap();
    h.mock.fail("GET /tables/events_REALTIME");

    let syncers = build_syncers(&manifest, &h.client).unwrap();
    let mut state = h.persistence.load().await.unwrap();
    let err = refresh(&syncers, &h.client, &mut state, &h.persistence)
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionerError::Transport(ref e) if e.status() == Some(500)));
    assert!(state.get(&table_addr()).is_some());
    assert_eq!(h.persistence.load().await.unwrap().resources.len(), 3);
}

#[tokio::test]
async fn undeclared_resources_are_deleted_dependents_first() {
    let h = start().await;
    provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();
    h.mock.clear_requests();

    let only_schema = manifest(vec![schema_decl()], vec![], vec![]);
    let entries = preview(&only_schema, &h.client, &h.persistence).await.unwrap();
    let orphans: Vec<_> = entries.iter().filter(|e| e.cause == Cause::Orphaned).collect();
    assert_eq!(orphans.len(), 2);
    assert!(orphans.iter().all(|e| e.action == Action::Delete));

    let report = provision(&only_schema, &h.client, &h.persistence).await.unwrap();

    assert_eq!(report.deleted, [user_addr(), table_addr()]);
    assert_eq!(
        h.mock.writes(),
        [
            "DELETE /users/alice?component=BROKER&componentType=BROKER",
            "DELETE /tables/events?type=REALTIME"
        ]
    );
    assert_eq!(h.persistence.load().await.unwrap().resources.len(), 1);
}

#[tokio::test]
async fn existing_untracked_resource_is_adopted() {
    let h = start().await;
    provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();
    tokio::fs::remove_file(&h.persistence.local_path).await.unwrap();
    h.mock.clear_requests();

    let only_schema = manifest(vec![schema_decl()], vec![], vec![]);
    let report = provision(&only_schema, &h.client, &h.persistence).await.unwrap();

    assert_eq!(
        report.adopted,
        [ResourceAddr::new(ResourceKind::Schema, "events")]
    );
    assert!(h.mock.writes().is_empty());
    assert_eq!(h.persistence.load().await.unwrap().resources.len(), 1);
}

#[tokio::test]
async fn destroy_removes_everything_in_reverse() {
    let h = start().await;
    provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();
    h.mock.clear_requests();

    let deleted = destroy(&h.client, &h.persistence).await.unwrap();

    assert_eq!(deleted.len(), 3);
    assert_eq!(
        h.mock.writes(),
        [
            "DELETE /users/alice?component=BROKER&componentType=BROKER",
            "DELETE /tables/events?type=REALTIME",
            "DELETE /schemas/events"
        ]
    );
    assert!(h.persistence.load().await.unwrap().resources.is_empty());
    h.mock.with(|c| {
        assert!(c.schemas.is_empty() && c.tables.is_empty() && c.users.is_empty());
    });
}

#[tokio::test]
async fn table_delete_falls_back_to_composite_id() {
    let h = start().await;
    provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();
    h.mock.fail("DELETE /tables/events");
    h.mock.clear_requests();

    destroy(&h.client, &h.persistence).await.unwrap();

    let writes = h.mock.writes();
    assert!(writes.contains(&"DELETE /tables/events?type=REALTIME".to_string()));
    assert!(writes.contains(&"DELETE /tables/events_REALTIME".to_string()));
    assert!(h.mock.with(|c| c.tables.is_empty()));
}

#[tokio::test]
async fn both_table_deletes_failing_reports_both_causes() {
    let h = start().await;
    provision(&full_manifest(), &h.client, &h.persistence).await.unwrap();
    h.mock.fail("DELETE /tables/events");
    h.mock.fail("DELETE /tables/events_REALTIME");

    let err = destroy(&h.client, &h.persistence).await.unwrap_err();

    let msg = err.to_string();
    assert!(matches!(err, ProvisionerError::DeleteFailed(_)));
    assert!(msg.contains("logical delete failed"));
    assert!(msg.contains("fallback delete failed"));
    assert!(msg.contains("events_REALTIME"));

    // The user went first and is gone; the table and schema are still tracked.
    let state = h.persistence.load().await.unwrap();
    assert!(state.get(&user_addr()).is_none());
    assert!(state.get(&table_addr()).is_some());
    assert_eq!(state.resources.len(), 2);
}
