use pinot_provisioner::{
    ProvisionerError, ProvisionerState, ResourceAddr, ResourceKind, ResourceState,
    ResourceStatus, StatePersistence,
};
use serde_json::json;

use ResourceStatus::*;

#[test]
fn lifecycle_allows_only_forward_transitions() {
    let allowed = [
        (Planned, Creating),
        (Planned, Present),
        (Creating, Present),
        (Present, Updating),
        (Updating, Present),
        (Present, Deleting),
        (Deleting, Absent),
        (Present, Absent),
    ];
    let all = [Planned, Creating, Present, Updating, Deleting, Absent];

    for from in all {
        for to in all {
            assert_eq!(
                from.can_transition_to(to),
                allowed.contains(&(from, to)),
                "{from:?} -> {to:?}"
            );
        }
    }
}

#[test]
fn invalid_transition_names_the_resource() {
    let addr = ResourceAddr::new(ResourceKind::Schema, "events");

    let err = Absent.transition(&addr, Present).unwrap_err();

    assert!(matches!(
        err,
        ProvisionerError::InvalidTransition { from: Absent, to: Present, .. }
    ));
    assert!(err.to_string().contains("schema.events"));
}

#[test]
fn addresses_parse_from_their_display_form() {
    let addr: ResourceAddr = "user.alice|BROKER".parse().unwrap();
    assert_eq!(addr, ResourceAddr::new(ResourceKind::User, "alice|BROKER"));

    let dotted: ResourceAddr = "schema.web.events".parse().unwrap();
    assert_eq!(dotted.resource_name, "web.events");

    assert!("cluster.main".parse::<ResourceAddr>().is_err());
    assert!("events".parse::<ResourceAddr>().is_err());
}

#[test]
fn resource_state_debug_hides_secret() {
    let rs = ResourceState {
        resource_type: ResourceKind::User,
        resource_id: "alice|BROKER".into(),
        status: Present,
        properties: json!({"username": "alice"}),
        applied: None,
        secret: Some("s3cret".into()),
    };

    let debug = format!("{rs:?}");
    assert!(!debug.contains("s3cret"));
    assert!(debug.contains("<redacted>"));
}

#[tokio::test]
async fn persistence_round_trips_and_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let persistence = StatePersistence::new(dir.path().join("nested").join("state.json"));

    assert!(persistence.load().await.unwrap().resources.is_empty());

    let mut state = ProvisionerState {
        controller: "http://localhost:9000/".into(),
        ..ProvisionerState::default()
    };
    let addr = ResourceAddr::new(ResourceKind::Table, "events_OFFLINE");
    state.resources.insert(
        addr.clone(),
        ResourceState {
            resource_type: ResourceKind::Table,
            resource_id: "events_OFFLINE".into(),
            status: Present,
            properties: json!({"tableName": "events_OFFLINE"}),
            applied: Some(json!({"tableName": "events_OFFLINE", "quota": {"storage": "10G"}})),
            secret: None,
        },
    );
    persistence.flush(&state).await.unwrap();

    let raw = std::fs::read_to_string(&persistence.local_path).unwrap();
    assert!(raw.contains(r#""table.events_OFFLINE""#));
    assert!(!raw.contains("secret"));
    assert!(!persistence.local_path.with_extension("json.tmp").exists());

    let loaded = persistence.load().await.unwrap();
    assert_eq!(loaded.controller, "http://localhost:9000/");
    assert_eq!(loaded.get(&addr).unwrap().status, Present);
    assert_eq!(loaded.get(&addr).unwrap().applied.as_ref().unwrap()["quota"]["storage"], "10G");
}

#[tokio::test]
async fn corrupt_state_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{not json").unwrap();

    let err = StatePersistence::new(path).load().await.unwrap_err();

    assert!(matches!(err, ProvisionerError::State(_)));
}
