use std::fmt;
use std::path::Path;

use pinot_client::ClientConfig;
use pinot_core::Document;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::addr::{ResourceAddr, ResourceKind};
use crate::error::ProvisionerError;

/// Every declared resource is turned into a `ResourceSpec` by its syncer.
///
/// `desired` is what state and drift comparison see: for tables the
/// configuration without the generated credential, for users the record
/// without its password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub resource_type: ResourceKind,
    /// Controller-side identity, e.g. `events_OFFLINE` or `alice|BROKER`.
    pub resource_name: String,
    pub desired: Value,
}

impl ResourceSpec {
    pub fn addr(&self) -> ResourceAddr {
        ResourceAddr::new(self.resource_type, self.resource_name.clone())
    }

    /// Minimal spec for a tracked resource no longer in the manifest.
    pub fn orphaned(addr: &ResourceAddr) -> Self {
        Self {
            resource_type: addr.resource_type,
            resource_name: addr.resource_name.clone(),
            desired: Value::Null,
        }
    }
}

/// One field that doesn't match the declared value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDrift {
    /// Top-level document key, e.g. `segmentsConfig`
    pub field: String,
    pub expected: Value,
    pub actual: Value,
}

impl FieldDrift {
    /// Drift on a write-only value; both sides are masked.
    pub fn sensitive(field: &str, tracked: bool) -> Self {
        Self {
            field: field.to_string(),
            expected: Value::String("(sensitive)".into()),
            actual: if tracked {
                Value::String("(sensitive)".into())
            } else {
                Value::Null
            },
        }
    }
}

/// The declared resources, loaded from a JSON manifest file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Connection settings; non-empty values win over the environment.
    #[serde(default)]
    pub controller: ControllerDecl,
    #[serde(default)]
    pub schemas: Vec<SchemaDecl>,
    #[serde(default)]
    pub tables: Vec<TableDecl>,
    #[serde(default)]
    pub users: Vec<UserDecl>,
}

impl Manifest {
    pub async fn load(path: &Path) -> Result<Self, ProvisionerError> {
        let raw = tokio::fs::read(path).await.map_err(|e| {
            ProvisionerError::Manifest(format!("reading {}: {e}", path.display()))
        })?;
        let manifest: Manifest = serde_json::from_slice(&raw)
            .map_err(|e| ProvisionerError::Manifest(format!("{}: {e}", path.display())))?;
        tracing::debug!(
            path = %path.display(),
            schemas = manifest.schemas.len(),
            tables = manifest.tables.len(),
            users = manifest.users.len(),
            "manifest loaded"
        );
        Ok(manifest)
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerDecl {
    #[serde(default)]
    pub controller_url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
}

impl fmt::Debug for ControllerDecl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ControllerDecl")
            .field("controller_url", &self.controller_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .finish()
    }
}

impl ControllerDecl {
    pub fn to_config(&self) -> ClientConfig {
        ClientConfig {
            controller_url: self.controller_url.clone().unwrap_or_default(),
            username: self.username.clone(),
            password: self.password.clone(),
            token: self.token.clone(),
            database: self.database.clone(),
            timeout: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDecl {
    pub schema_name: String,
    pub schema: Value,
}

#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableDecl {
    pub table_name: String,
    pub table_type: String,
    pub table_config: Document,
    #[serde(default)]
    pub kafka_username: Option<String>,
    #[serde(default)]
    pub kafka_password: Option<String>,
}

impl fmt::Debug for TableDecl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TableDecl")
            .field("table_name", &self.table_name)
            .field("table_type", &self.table_type)
            .field("table_config", &self.table_config)
            .field("kafka_username", &self.kafka_username)
            .field("kafka_password", &self.kafka_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserDecl {
    pub username: String,
    pub component: String,
    pub role: String,
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl fmt::Debug for UserDecl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("UserDecl")
            .field("username", &self.username)
            .field("component", &self.component)
            .field("role", &self.role)
            .field("tables", &self.tables)
            .field("permissions", &self.permissions)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
