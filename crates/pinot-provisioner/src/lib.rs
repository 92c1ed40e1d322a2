//! pinot-provisioner
//!
//! Declarative lifecycle management for Pinot controller schemas, tables
//! and users.
//!
//! Public API:
//! - `refresh()`: re-read tracked resources, dropping the ones that are gone
//! - `plan()`: compare declared resources against the controller
//! - `execute()`: apply a plan, flushing state after each action
//! - `provision()`: convenience, refresh → plan → execute
//! - `destroy()`: tear down all tracked resources
//! - `import()`: start tracking an existing controller object

pub mod addr;
pub mod error;
pub mod manifest;
pub mod orchestrate;
pub mod persistence;
pub mod plan;
pub mod state;
pub mod syncer;
pub mod syncers;

use pinot_client::PinotClient;

pub use crate::addr::{ResourceAddr, ResourceKind};
pub use crate::error::ProvisionerError;
pub use crate::manifest::Manifest;
pub use crate::orchestrate::{destroy_all, execute, import, plan, refresh, ExecutionReport};
pub use crate::persistence::StatePersistence;
pub use crate::plan::{Action, Cause, PlanEntry};
pub use crate::state::{ProvisionerState, ResourceState, ResourceStatus};
pub use crate::syncer::ResourceSyncer;
pub use crate::syncers::build_syncers;

/// Plan without touching state: declared resources are read, tracked ones
/// that are no longer declared show up as deletes.
pub async fn preview(
    manifest: &Manifest,
    client: &PinotClient,
    persistence: &StatePersistence,
) -> Result<Vec<PlanEntry>, ProvisionerError> {
    let syncers = build_syncers(manifest, client)?;
    let state = persistence.load().await?;
    orchestrate::plan(&syncers, &state).await
}

/// Full provisioning: refresh → plan → execute.
pub async fn provision(
    manifest: &Manifest,
    client: &PinotClient,
    persistence: &StatePersistence,
) -> Result<ExecutionReport, ProvisionerError> {
    let syncers = build_syncers(manifest, client)?;
    let mut state = persistence.load().await?;
    state.controller = client.base_url().to_string();

    orchestrate::refresh(&syncers, client, &mut state, persistence).await?;
    let entries = orchestrate::plan(&syncers, &state).await?;

    if !plan::has_changes(&entries) {
        tracing::info!("all resources in sync, no changes needed");
        persistence.flush(&state).await?;
        return Ok(ExecutionReport::default());
    }

    let count = |action: Action| entries.iter().filter(|e| e.action == action).count();
    tracing::info!(
        adopts = count(Action::Adopt),
        creates = count(Action::Create),
        modifies = count(Action::Modify),
        deletes = count(Action::Delete),
        "executing provisioning plan"
    );
    orchestrate::execute(&entries, &syncers, client, &mut state, persistence).await
}

/// Destroy all tracked resources in reverse dependency order.
pub async fn destroy(
    client: &PinotClient,
    persistence: &StatePersistence,
) -> Result<Vec<ResourceAddr>, ProvisionerError> {
    let mut state = persistence.load().await?;
    orchestrate::destroy_all(&[], client, &mut state, persistence).await
}
