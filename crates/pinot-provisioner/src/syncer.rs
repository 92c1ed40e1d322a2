use std::future::Future;
use std::pin::Pin;

use pinot_core::normalize::is_subset;
use serde_json::Value;

use crate::error::ProvisionerError;
use crate::manifest::{FieldDrift, ResourceSpec};
use crate::state::ResourceState;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a create or update leaves behind for state.
#[derive(Debug, Clone)]
pub struct ResourceResult {
    /// Redacted document as submitted (or as re-read after create).
    pub properties: Value,
    pub secret: SecretUpdate,
    /// Secondary failures that did not fail the operation.
    pub warnings: Vec<String>,
}

/// How the tracked sensitive value changes after a write.
#[derive(Clone, PartialEq, Eq)]
pub enum SecretUpdate {
    Keep,
    Set(String),
    Clear,
}

impl std::fmt::Debug for SecretUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keep => f.write_str("Keep"),
            Self::Set(_) => f.write_str("Set(<redacted>)"),
            Self::Clear => f.write_str("Clear"),
        }
    }
}

impl SecretUpdate {
    pub fn apply(self, current: Option<String>) -> Option<String> {
        match self {
            Self::Keep => current,
            Self::Set(value) => Some(value),
            Self::Clear => None,
        }
    }
}

/// One impl per resource kind in the manifest.
/// Each impl holds its ResourceSpec, the validated desired document and a
/// controller client.
pub trait ResourceSyncer: Send + Sync {
    fn spec(&self) -> &ResourceSpec;

    /// Read the normalized remote document. None = confirmed absent.
    fn read(&self) -> BoxFuture<'_, Result<Option<Value>, ProvisionerError>>;

    /// Compare a read against `self.spec().desired`. `tracked` supplies the
    /// sensitive value and the last-applied document, if any.
    fn diff(&self, actual: &Value, tracked: Option<&ResourceState>) -> Vec<FieldDrift>;

    fn create(&self) -> BoxFuture<'_, Result<ResourceResult, ProvisionerError>>;

    fn update(&self) -> BoxFuture<'_, Result<ResourceResult, ProvisionerError>>;

    fn destroy(&self) -> BoxFuture<'_, Result<(), ProvisionerError>>;
}

/// Top-level drift between a declared document and a read.
///
/// Each declared key drifts unless `actual` holds a matching superset there;
/// a key declared `null` matches an absent one. Keys in `applied` (the last
/// document this tool wrote) that are no longer declared drift towards
/// `null` while the controller still has them. Keys the controller added on
/// its own are ignored.
pub fn document_drift(desired: &Value, actual: &Value, applied: Option<&Value>) -> Vec<FieldDrift> {
    let Some(desired) = desired.as_object() else {
        return vec![];
    };

    let mut drift: Vec<FieldDrift> = desired
        .iter()
        .filter_map(|(key, expected)| {
            let found = actual.get(key).unwrap_or(&Value::Null);
            (!is_subset(expected, found)).then(|| FieldDrift {
                field: key.clone(),
                expected: expected.clone(),
                actual: found.clone(),
            })
        })
        .collect();

    if let Some(applied) = applied.and_then(Value::as_object) {
        for key in applied.keys().filter(|key| !desired.contains_key(*key)) {
            match actual.get(key) {
                Some(found) if !found.is_null() => drift.push(FieldDrift {
                    field: key.clone(),
                    expected: Value::Null,
                    actual: found.clone(),
                }),
                _ => {}
            }
        }
    }

    drift
}
