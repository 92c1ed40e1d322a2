use pinot_client::PinotClient;
use pinot_core::Document;
use pinot_core::credential::{build_credential, inject_credential, Credential};
use pinot_core::normalize::{extract_physical_config, redact_secret};
use pinot_core::table_id::{validate_document_identity, Flavor, TableId};
use serde_json::Value;

use crate::addr::ResourceKind;
use crate::error::{format_err_chain, ProvisionerError};
use crate::manifest::{FieldDrift, ResourceSpec, TableDecl};
use crate::state::ResourceState;
use crate::syncer::{document_drift, BoxFuture, ResourceResult, ResourceSyncer, SecretUpdate};

/// Drift field name for the generated SASL credential.
pub const CREDENTIAL_FIELD: &str = "sasl_jaas_config";

pub struct TableSyncer {
    spec: ResourceSpec,
    table: TableId,
    config: Document,
    credential: Option<Credential>,
    client: PinotClient,
}

impl TableSyncer {
    /// Resolve the identity, check the embedded `tableName`/`tableType`
    /// against it and build the credential. No request is made.
    pub fn new(decl: &TableDecl, client: PinotClient) -> Result<Self, ProvisionerError> {
        let flavor: Flavor = decl.table_type.parse()?;
        let table = TableId::new(&decl.table_name, flavor)?;
        validate_document_identity(&decl.table_config, &table.composite(), flavor)?;
        let credential = build_credential(
            decl.kafka_username.as_deref(),
            decl.kafka_password.as_deref(),
        )?;

        let spec = ResourceSpec {
            resource_type: ResourceKind::Table,
            resource_name: table.composite(),
            desired: Value::Object(redact_secret(&decl.table_config)),
        };
        Ok(Self {
            spec,
            table,
            config: decl.table_config.clone(),
            credential,
            client,
        })
    }

    /// The document actually submitted: a copy of the declared one with the
    /// credential injected.
    fn payload(&self) -> Document {
        match &self.credential {
            Some(credential) => inject_credential(self.config.clone(), credential),
            None => self.config.clone(),
        }
    }

    fn result(&self, payload: &Document, warnings: Vec<String>) -> ResourceResult {
        ResourceResult {
            properties: Value::Object(redact_secret(payload)),
            secret: match &self.credential {
                Some(credential) => SecretUpdate::Set(credential.expose().to_string()),
                None => SecretUpdate::Clear,
            },
            warnings,
        }
    }
}

impl ResourceSyncer for TableSyncer {
    fn spec(&self) -> &ResourceSpec {
        &self.spec
    }

    fn read(&self) -> BoxFuture<'_, Result<Option<Value>, ProvisionerError>> {
        Box::pin(read_table(&self.client, &self.table))
    }

    fn diff(&self, actual: &Value, tracked: Option<&ResourceState>) -> Vec<FieldDrift> {
        let applied = tracked.and_then(|rs| rs.applied.as_ref());
        let secret = tracked.and_then(|rs| rs.secret.as_deref());
        let mut drift = document_drift(&self.spec.desired, actual, applied);
        let declared = self.credential.as_ref().map(Credential::expose);
        if declared != secret {
            drift.push(FieldDrift::sensitive(CREDENTIAL_FIELD, secret.is_some()));
        }
        drift
    }

    fn create(&self) -> BoxFuture<'_, Result<ResourceResult, ProvisionerError>> {
        Box::pin(async {
            let payload = self.payload();
            self.client.create_table(&payload).await?;
            Ok(self.result(&payload, vec![]))
        })
    }

    fn update(&self) -> BoxFuture<'_, Result<ResourceResult, ProvisionerError>> {
        Box::pin(async {
            let payload = self.payload();
            self.client.update_table(&payload).await?;

            let mut warnings = Vec::new();
            if let Err(e) = self.client.reload_table_segments(&self.table).await {
                let msg = format!(
                    "updated table {} but segment reload failed: {}",
                    self.table,
                    format_err_chain(&e)
                );
                tracing::warn!(table = %self.table, error = %e, "segment reload failed");
                warnings.push(msg);
            }
            Ok(self.result(&payload, warnings))
        })
    }

    fn destroy(&self) -> BoxFuture<'_, Result<(), ProvisionerError>> {
        Box::pin(delete_table(&self.client, &self.table))
    }
}

/// Read and normalize a table: unwrap the flavor key, drop the credential.
/// A 404 or an empty body is confirmed absence.
pub(crate) async fn read_table(
    client: &PinotClient,
    table: &TableId,
) -> Result<Option<Value>, ProvisionerError> {
    let raw = match client.get_table(&table.composite()).await {
        Ok(raw) => raw,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    match extract_physical_config(raw) {
        Value::Null => Ok(None),
        Value::Object(map) if map.is_empty() => Ok(None),
        Value::Object(map) => Ok(Some(Value::Object(redact_secret(&map)))),
        other => Err(ProvisionerError::UnexpectedResponse(format!(
            "table {table}: expected an object, got {other}"
        ))),
    }
}

/// Delete by logical name and flavor, falling back to the composite id.
///
/// The first form is what current controllers expect; older ones only
/// accept the second. A 404 on the first form counts as success.
pub(crate) async fn delete_table(
    client: &PinotClient,
    table: &TableId,
) -> Result<(), ProvisionerError> {
    let primary = match client.delete_table_by_logical(&table.logical, table.flavor).await {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    tracing::debug!(table = %table, error = %primary, "logical delete failed, trying composite id");

    match client.delete_table(&table.composite()).await {
        Ok(()) => Ok(()),
        Err(fallback) => Err(ProvisionerError::DeleteFailed(format!(
            "logical delete failed: {}; fallback delete failed: {}",
            format_err_chain(&primary),
            format_err_chain(&fallback)
        ))
        .with_resource(&table.composite())),
    }
}
