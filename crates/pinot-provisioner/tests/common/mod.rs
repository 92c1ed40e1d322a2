//! A stateful in-process Pinot controller for lifecycle tests.
//!
//! Holds schemas, tables and users in memory, answers the REST routes the
//! client uses, records every request as `"METHOD /path?query"`, and fails
//! any `"METHOD /path"` listed in `failures` with a 500.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use pinot_client::{ClientConfig, PinotClient};
use pinot_provisioner::{Manifest, StatePersistence};
use serde_json::{json, Value};
use tempfile::TempDir;

#[derive(Default)]
pub struct Controller {
    pub schemas: BTreeMap<String, Value>,
    /// Keyed by composite id.
    pub tables: BTreeMap<String, Value>,
    /// Keyed by `username_COMPONENT`, stored without password.
    pub users: BTreeMap<String, Value>,
    pub passwords: BTreeMap<String, String>,
    /// Replaces every `GET /users/..` body when set.
    pub user_body: Option<Value>,
    pub failures: HashSet<String>,
    pub requests: Vec<String>,
}

#[derive(Clone, Default)]
pub struct Mock(pub Arc<Mutex<Controller>>);

impl Mock {
    pub fn with<R>(&self, f: impl FnOnce(&mut Controller) -> R) -> R {
        f(&mut self.0.lock().unwrap())
    }

    pub fn fail(&self, route: &str) {
        self.with(|c| c.failures.insert(route.to_string()));
    }

    pub fn requests(&self) -> Vec<String> {
        self.with(|c| c.requests.clone())
    }

    pub fn clear_requests(&self) {
        self.with(|c| c.requests.clear());
    }

    /// Requests other than reads.
    pub fn writes(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| !r.starts_with("GET "))
            .collect()
    }
}

fn ok() -> (StatusCode, String) {
    (StatusCode::OK, json!({"status": "ok"}).to_string())
}

fn not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, json!({"code": 404, "error": "not found"}).to_string())
}

fn bad_request(msg: &str) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, json!({"code": 400, "error": msg}).to_string())
}

fn query_param(uri: &Uri, name: &str) -> Option<String> {
    uri.query()?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

fn flavor_of(id: &str) -> Option<&'static str> {
    if id.ends_with("_OFFLINE") {
        Some("OFFLINE")
    } else if id.ends_with("_REALTIME") {
        Some("REALTIME")
    } else {
        None
    }
}

async fn handle(State(mock): State<Mock>, method: Method, uri: Uri, body: String) -> (StatusCode, String) {
    let mut c = mock.0.lock().unwrap();
    let path = uri.path().to_string();
    let logged = match uri.query() {
        Some(q) => format!("{method} {path}?{q}"),
        None => format!("{method} {path}"),
    };
    c.requests.push(logged);

    if c.failures.contains(&format!("{method} {path}")) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"code": 500, "error": "injected failure"}).to_string(),
        );
    }

    let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    match (method.as_str(), segments.as_slice()) {
        ("POST", ["schemas"]) => match body["schemaName"].as_str() {
            Some(name) => {
                c.schemas.insert(name.to_string(), body.clone());
                ok()
            }
            None => bad_request("schemaName missing"),
        },
        ("GET", ["schemas", name]) => match c.schemas.get(*name) {
            Some(doc) => (StatusCode::OK, doc.to_string()),
            None => not_found(),
        },
        ("PUT", ["schemas", name]) if c.schemas.contains_key(*name) => {
            c.schemas.insert(name.to_string(), body);
            ok()
        }
        ("DELETE", ["schemas", name]) => match c.schemas.remove(*name) {
            Some(_) => ok(),
            None => not_found(),
        },

        ("POST", ["tables"]) => match body["tableName"].as_str() {
            Some(name) if flavor_of(name).is_some() => {
                c.tables.insert(name.to_string(), body.clone());
                ok()
            }
            _ => bad_request("tableName missing"),
        },
        ("GET", ["tables", id]) => match (c.tables.get(*id), flavor_of(id)) {
            (Some(doc), Some(flavor)) => (StatusCode::OK, json!({ flavor: doc }).to_string()),
            _ => not_found(),
        },
        ("PUT", ["tables", name]) if c.tables.contains_key(*name) => {
            c.tables.insert(name.to_string(), body);
            ok()
        }
        ("DELETE", ["tables", name]) => {
            let id = match query_param(&uri, "type") {
                Some(flavor) => format!("{name}_{flavor}"),
                None => name.to_string(),
            };
            match c.tables.remove(&id) {
                Some(_) => ok(),
                None => not_found(),
            }
        }
        ("POST", ["segments", _, "reload"]) => ok(),

        ("POST", ["users"]) => {
            let (Some(username), Some(component)) =
                (body["username"].as_str(), body["component"].as_str())
            else {
                return bad_request("username and component required");
            };
            let key = format!("{username}_{component}");
            let mut record = body.clone();
            if let Some(password) = record
                .as_object_mut()
                .and_then(|m| m.remove("password"))
                .and_then(|p| p.as_str().map(String::from))
            {
                c.passwords.insert(key.clone(), password);
            }
            c.users.insert(key, record);
            ok()
        }
        ("GET", ["users", name]) => {
            if let Some(raw) = &c.user_body {
                return (StatusCode::OK, raw.to_string());
            }
            let component = query_param(&uri, "component").unwrap_or_default();
            let key = format!("{name}_{component}");
            match c.users.get(&key) {
                Some(record) => (StatusCode::OK, json!({ key: record }).to_string()),
                None => not_found(),
            }
        }
        ("PUT", ["users", name]) => {
            let component = query_param(&uri, "component").unwrap_or_default();
            let key = format!("{name}_{component}");
            if !c.users.contains_key(&key) {
                return not_found();
            }
            let mut record = body.clone();
            if let Some(password) = record
                .as_object_mut()
                .and_then(|m| m.remove("password"))
                .and_then(|p| p.as_str().map(String::from))
            {
                c.passwords.insert(key.clone(), password);
            }
            c.users.insert(key, record);
            ok()
        }
        ("DELETE", ["users", name]) => {
            let component = query_param(&uri, "component").unwrap_or_default();
            match c.users.remove(&format!("{name}_{component}")) {
                Some(_) => ok(),
                None => not_found(),
            }
        }

        _ => not_found(),
    }
}

pub struct Harness {
    pub mock: Mock,
    pub client: PinotClient,
    pub persistence: StatePersistence,
    _dir: TempDir,
}

pub async fn start() -> Harness {
    let mock = Mock::default();
    let app = Router::new().fallback(handle).with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = PinotClient::new(&ClientConfig::new(format!("http://{addr}"))).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let persistence = StatePersistence::new(dir.path().join("state.json"));
    Harness {
        mock,
        client,
        persistence,
        _dir: dir,
    }
}

pub fn schema_decl() -> Value {
    json!({
        "schema_name": "events",
        "schema": {
            "schemaName": "events",
            "dimensionFieldSpecs": [{"name": "userId", "dataType": "STRING"}],
            "metricFieldSpecs": [{"name": "count", "dataType": "LONG"}],
            "dateTimeFieldSpecs": [{
                "name": "ts", "dataType": "LONG",
                "format": "1:MILLISECONDS:EPOCH", "granularity": "1:HOURS"
            }]
        }
    })
}

pub fn table_decl() -> Value {
    json!({
        "table_name": "events",
        "table_type": "REALTIME",
        "kafka_username": "svc",
        "kafka_password": "hunter2",
        "table_config": {
            "tableName": "events_REALTIME",
            "tableType": "REALTIME",
            "segmentsConfig": {"schemaName": "events", "replication": "1"},
            "ingestionConfig": {
                "streamIngestionConfig": {
                    "streamConfigMaps": [{
                        "streamType": "kafka",
                        "stream.kafka.topic.name": "events"
                    }]
                }
            }
        }
    })
}

pub fn user_decl() -> Value {
    json!({
        "username": "alice",
        "component": "BROKER",
        "role": "USER",
        "tables": ["events"],
        "permissions": ["READ"],
        "password": "s3cret"
    })
}

pub fn manifest(schemas: Vec<Value>, tables: Vec<Value>, users: Vec<Value>) -> Manifest {
    serde_json::from_value(json!({
        "schemas": schemas,
        "tables": tables,
        "users": users,
    }))
    .unwrap()
}

pub fn full_manifest() -> Manifest {
    manifest(vec![schema_decl()], vec![table_decl()], vec![user_decl()])
}
