//! Kafka SASL credential handling for realtime table configurations.
//!
//! The generated `sasl.jaas.config` string is sent to the controller inside
//! the stream config maps, but is tracked locally as a separate sensitive
//! value; [`crate::normalize::redact_secret`] removes it again before a
//! document is stored or compared.

use std::fmt;

use serde_json::{Map, Value};

use crate::Document;
use crate::error::CoreError;

pub const INGESTION_CONFIG: &str = "ingestionConfig";
pub const STREAM_INGESTION_CONFIG: &str = "streamIngestionConfig";
pub const STREAM_CONFIG_MAPS: &str = "streamConfigMaps";
pub const SASL_JAAS_CONFIG: &str = "sasl.jaas.config";

/// A generated `sasl.jaas.config` value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Build the SCRAM login module string from Kafka credentials.
///
/// Both values absent (or both the empty string) yields `Ok(None)`. Supplying
/// only one of them, or a whitespace-only value, is an error. Values are
/// embedded verbatim: quotes and backslashes are not escaped.
pub fn build_credential(
    username: Option<&str>,
    password: Option<&str>,
) -> Result<Option<Credential>, CoreError> {
    let username = username.filter(|u| !u.is_empty());
    let password = password.filter(|p| !p.is_empty());

    let (username, password) = match (username, password) {
        (None, None) => return Ok(None),
        (Some(u), Some(p)) => (u, p),
        _ => {
            return Err(CoreError::IncompleteCredentials(
                "both kafka_username and kafka_password must be provided together".into(),
            ));
        }
    };

    if username.trim().is_empty() || password.trim().is_empty() {
        return Err(CoreError::IncompleteCredentials(
            "both kafka_username and kafka_password must be non-empty".into(),
        ));
    }

    Ok(Some(Credential(format!(
        r#"org.apache.kafka.common.security.scram.ScramLoginModule required username="{username}" password="{password}";"#
    ))))
}

/// Place `credential` at
/// `ingestionConfig.streamIngestionConfig.streamConfigMaps[0]["sasl.jaas.config"]`.
///
/// Missing (or non-object) `ingestionConfig` / `streamIngestionConfig` are
/// created. For the config maps: a mapping is updated in place, a non-empty
/// sequence has only its first slot touched, and anything else becomes a
/// one-element sequence.
pub fn inject_credential(mut document: Document, credential: &Credential) -> Document {
    let ingestion = object_entry(&mut document, INGESTION_CONFIG);
    let stream = object_entry(ingestion, STREAM_INGESTION_CONFIG);
    let secret = || Value::String(credential.expose().to_string());

    match stream.get_mut(STREAM_CONFIG_MAPS) {
        Some(Value::Object(map)) => {
            map.insert(SASL_JAAS_CONFIG.into(), secret());
        }
        Some(Value::Array(items)) if !items.is_empty() => match &mut items[0] {
            Value::Object(first) => {
                first.insert(SASL_JAAS_CONFIG.into(), secret());
            }
            slot => *slot = secret_map(secret()),
        },
        _ => {
            stream.insert(
                STREAM_CONFIG_MAPS.into(),
                Value::Array(vec![secret_map(secret())]),
            );
        }
    }

    document
}

fn object_entry<'a>(parent: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let slot = parent
        .entry(key)
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(map) => map,
        _ => unreachable!("slot was just replaced with an object"),
    }
}

fn secret_map(secret: Value) -> Value {
    let mut map = Map::new();
    map.insert(SASL_JAAS_CONFIG.into(), secret);
    Value::Object(map)
}
