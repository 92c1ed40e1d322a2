//! Document normalization.
//!
//! Everything that turns a controller response into the local, comparable
//! representation (and back) without touching the network.

use serde_json::Value;

use crate::Document;
use crate::credential::{INGESTION_CONFIG, SASL_JAAS_CONFIG, STREAM_CONFIG_MAPS, STREAM_INGESTION_CONFIG};
use crate::error::CoreError;
use crate::schema::SchemaDocument;
use crate::table_id::Flavor;

/// Reject a schema whose embedded `schemaName` differs from the declared name.
pub fn validate_schema_name(document: &SchemaDocument, declared: &str) -> Result<(), CoreError> {
    if document.schema_name != declared {
        return Err(CoreError::NameMismatch {
            declared: declared.to_string(),
            document: document.schema_name.clone(),
        });
    }
    Ok(())
}

/// Unwrap the flavor envelope of a `GET /tables/{id}` response.
///
/// The controller answers `{"OFFLINE": {...}}` or `{"REALTIME": {...}}`.
/// Anything else (older servers, already-unwrapped bodies) passes through.
pub fn extract_physical_config(raw: Value) -> Value {
    let Value::Object(mut map) = raw else {
        return raw;
    };

    for flavor in [Flavor::Offline, Flavor::Realtime] {
        if map.get(flavor.as_str()).is_some_and(Value::is_object) {
            if let Some(inner) = map.remove(flavor.as_str()) {
                return inner;
            }
        }
    }

    Value::Object(map)
}

/// Copy of `document` with `sasl.jaas.config` stripped from every mapping at
/// `ingestionConfig.streamIngestionConfig.streamConfigMaps`.
///
/// Both container shapes are handled: a single mapping, or a sequence whose
/// mapping elements are each cleaned (other elements are kept as they are).
pub fn redact_secret(document: &Document) -> Document {
    let mut out = document.clone();

    let Some(stream_config_maps) = out
        .get_mut(INGESTION_CONFIG)
        .and_then(Value::as_object_mut)
        .and_then(|ingestion| ingestion.get_mut(STREAM_INGESTION_CONFIG))
        .and_then(Value::as_object_mut)
        .and_then(|stream| stream.get_mut(STREAM_CONFIG_MAPS))
    else {
        return out;
    };

    match stream_config_maps {
        Value::Object(map) => {
            map.shift_remove(SASL_JAAS_CONFIG);
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                if let Value::Object(map) = item {
                    map.shift_remove(SASL_JAAS_CONFIG);
                }
            }
        }
        _ => {}
    }

    out
}

/// Structural containment: every field present in `desired` exists in
/// `actual` with a containing value.
///
/// Objects may carry extra keys on the `actual` side (server-filled
/// defaults), and a `null` in `desired` is satisfied by an absent key.
/// Arrays must have the same length and match element-wise. Scalars compare
/// equal, with numbers compared by value.
pub fn is_subset(desired: &Value, actual: &Value) -> bool {
    match (desired, actual) {
        (Value::Object(want), Value::Object(have)) => {
            want.iter().all(|(key, value)| match have.get(key) {
                Some(other) => is_subset(value, other),
                None => value.is_null(),
            })
        }
        (Value::Array(want), Value::Array(have)) => {
            want.len() == have.len() && want.iter().zip(have).all(|(a, b)| is_subset(a, b))
        }
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (a, b) => a == b,
    }
}
