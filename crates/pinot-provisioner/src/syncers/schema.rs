use pinot_client::PinotClient;
use pinot_core::normalize::validate_schema_name;
use pinot_core::schema::SchemaDocument;
use serde_json::Value;

use crate::addr::ResourceKind;
use crate::error::ProvisionerError;
use crate::manifest::{FieldDrift, ResourceSpec, SchemaDecl};
use crate::state::ResourceState;
use crate::syncer::{document_drift, BoxFuture, ResourceResult, ResourceSyncer, SecretUpdate};

pub struct SchemaSyncer {
    spec: ResourceSpec,
    document: SchemaDocument,
    client: PinotClient,
}

impl SchemaSyncer {
    pub fn new(decl: &SchemaDecl, client: PinotClient) -> Result<Self, ProvisionerError> {
        let document = SchemaDocument::from_value(decl.schema.clone()).map_err(|e| {
            ProvisionerError::Manifest(format!("schema {}: {e}", decl.schema_name))
        })?;
        validate_schema_name(&document, &decl.schema_name)?;

        let spec = ResourceSpec {
            resource_type: ResourceKind::Schema,
            resource_name: decl.schema_name.clone(),
            desired: document.to_value()?,
        };
        Ok(Self {
            spec,
            document,
            client,
        })
    }

    fn result(&self) -> ResourceResult {
        ResourceResult {
            properties: self.spec.desired.clone(),
            secret: SecretUpdate::Clear,
            warnings: vec![],
        }
    }
}

impl ResourceSyncer for SchemaSyncer {
    fn spec(&self) -> &ResourceSpec {
        &self.spec
    }

    fn read(&self) -> BoxFuture<'_, Result<Option<Value>, ProvisionerError>> {
        Box::pin(read_schema(&self.client, &self.spec.resource_name))
    }

    fn diff(&self, actual: &Value, tracked: Option<&ResourceState>) -> Vec<FieldDrift> {
        let applied = tracked.and_then(|rs| rs.applied.as_ref());
        document_drift(&self.spec.desired, actual, applied)
    }

    fn create(&self) -> BoxFuture<'_, Result<ResourceResult, ProvisionerError>> {
        Box::pin(async {
            self.client.create_schema(&self.document).await?;
            Ok(self.result())
        })
    }

    fn update(&self) -> BoxFuture<'_, Result<ResourceResult, ProvisionerError>> {
        Box::pin(async {
            self.client.update_schema(&self.document).await?;
            Ok(self.result())
        })
    }

    fn destroy(&self) -> BoxFuture<'_, Result<(), ProvisionerError>> {
        Box::pin(delete_schema(&self.client, &self.spec.resource_name))
    }
}

pub(crate) async fn read_schema(
    client: &PinotClient,
    name: &str,
) -> Result<Option<Value>, ProvisionerError> {
    match client.get_schema(name).await {
        Ok(Value::Null) => Ok(None),
        Ok(Value::Object(map)) if map.is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub(crate) async fn delete_schema(client: &PinotClient, name: &str) -> Result<(), ProvisionerError> {
    match client.delete_schema(name).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => {
            tracing::debug!(schema = name, "schema already absent");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
