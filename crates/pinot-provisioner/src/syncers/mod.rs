pub mod schema;
pub mod table;
pub mod user;

use std::collections::HashSet;

use pinot_client::PinotClient;
use serde_json::Value;

use crate::addr::{ResourceAddr, ResourceKind};
use crate::error::ProvisionerError;
use crate::manifest::Manifest;
use crate::syncer::ResourceSyncer;

pub use schema::SchemaSyncer;
pub use table::TableSyncer;
pub use user::UserSyncer;

/// Build one syncer per declared resource: schemas, then tables, then users.
///
/// Every declaration is validated here, so a bad manifest fails before
/// anything is read or written.
pub fn build_syncers(
    manifest: &Manifest,
    client: &PinotClient,
) -> Result<Vec<Box<dyn ResourceSyncer>>, ProvisionerError> {
    let mut syncers: Vec<Box<dyn ResourceSyncer>> = Vec::new();

    for decl in &manifest.schemas {
        syncers.push(Box::new(SchemaSyncer::new(decl, client.clone())?));
    }
    for decl in &manifest.tables {
        syncers.push(Box::new(TableSyncer::new(decl, client.clone())?));
    }
    for decl in &manifest.users {
        syncers.push(Box::new(UserSyncer::new(decl, client.clone())?));
    }

    let mut seen = HashSet::new();
    for syncer in &syncers {
        let addr = syncer.spec().addr();
        if !seen.insert(addr.clone()) {
            return Err(ProvisionerError::Manifest(format!("{addr} is declared more than once")));
        }
    }

    Ok(syncers)
}

/// Read a resource knowing only its address, as for orphans and imports.
pub async fn read_by_addr(
    client: &PinotClient,
    addr: &ResourceAddr,
) -> Result<Option<Value>, ProvisionerError> {
    match addr.resource_type {
        ResourceKind::Schema => schema::read_schema(client, &addr.resource_name).await,
        ResourceKind::Table => {
            let table = pinot_core::table_id::TableId::parse(&addr.resource_name)?;
            table::read_table(client, &table).await
        }
        ResourceKind::User => {
            let (username, component) = user::parse_user_id(&addr.resource_name)?;
            user::read_user(client, &username, component).await
        }
    }
}

/// Delete a resource knowing only its address.
pub async fn destroy_by_addr(
    client: &PinotClient,
    addr: &ResourceAddr,
) -> Result<(), ProvisionerError> {
    match addr.resource_type {
        ResourceKind::Schema => schema::delete_schema(client, &addr.resource_name).await,
        ResourceKind::Table => {
            let table = pinot_core::table_id::TableId::parse(&addr.resource_name)?;
            table::delete_table(client, &table).await
        }
        ResourceKind::User => {
            let (username, component) = user::parse_user_id(&addr.resource_name)?;
            user::delete_user(client, &username, component).await
        }
    }
}
