use std::collections::{HashMap, HashSet};

use pinot_client::PinotClient;
use pinot_core::table_id::TableId;

use crate::addr::{ResourceAddr, ResourceKind};
use crate::error::ProvisionerError;
use crate::manifest::ResourceSpec;
use crate::persistence::StatePersistence;
use crate::plan::{Action, Cause, PlanEntry};
use crate::state::{ProvisionerState, ResourceState, ResourceStatus};
use crate::syncer::ResourceSyncer;
use crate::syncers::{self, user};

/// What an `execute` run did.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub adopted: Vec<ResourceAddr>,
    pub created: Vec<ResourceAddr>,
    pub modified: Vec<ResourceAddr>,
    pub deleted: Vec<ResourceAddr>,
    pub warnings: Vec<String>,
}

fn syncer_map(syncers: &[Box<dyn ResourceSyncer>]) -> HashMap<ResourceAddr, &dyn ResourceSyncer> {
    syncers
        .iter()
        .map(|s| (s.spec().addr(), s.as_ref()))
        .collect()
}

/// Re-read every tracked resource.
///
/// Confirmed absence removes the entry. A successful read replaces the
/// stored properties and keeps the sensitive value, which the controller
/// never returns. Any other failure is returned with the entry untouched.
pub async fn refresh(
    syncers: &[Box<dyn ResourceSyncer>],
    client: &PinotClient,
    state: &mut ProvisionerState,
    persistence: &StatePersistence,
) -> Result<(), ProvisionerError> {
    let by_addr = syncer_map(syncers);
    let tracked: Vec<ResourceAddr> = state.resources.keys().cloned().collect();

    for addr in tracked {
        let actual = match by_addr.get(&addr) {
            Some(syncer) => syncer.read().await?,
            None => syncers::read_by_addr(client, &addr).await?,
        };
        let Some(rs) = state.resources.get_mut(&addr) else {
            continue;
        };

        match actual {
            Some(properties) => {
                rs.properties = properties;
            }
            None => {
                tracing::info!(addr = %addr, "resource no longer exists, dropping from state");
                rs.status.transition(&addr, ResourceStatus::Absent)?;
                state.resources.remove(&addr);
            }
        }
        persistence.flush(state).await?;
    }

    Ok(())
}

/// Read every declared resource and produce an annotated plan.
///
/// One entry per syncer, in manifest order, plus a `Delete` entry for each
/// tracked resource that is no longer declared. Orphan identities are
/// checked here so a bad one fails before anything is changed.
pub async fn plan(
    syncers: &[Box<dyn ResourceSyncer>],
    state: &ProvisionerState,
) -> Result<Vec<PlanEntry>, ProvisionerError> {
    let mut entries = Vec::new();

    for syncer in syncers {
        let spec = syncer.spec();
        let addr = spec.addr();
        let tracked = state.get(&addr).is_some();
        let actual = syncer.read().await?;

        let entry = match actual {
            None => PlanEntry {
                spec: spec.clone(),
                action: Action::Create,
                cause: if tracked {
                    Cause::Missing
                } else {
                    Cause::FirstProvision
                },
                drift: vec![],
                observed: None,
            },
            Some(actual) => {
                let drift = syncer.diff(&actual, state.get(&addr));
                let (action, cause) = match (tracked, drift.is_empty()) {
                    (true, true) => (Action::Ok, Cause::InSync),
                    (true, false) => (Action::Modify, Cause::Drift),
                    (false, true) => (Action::Adopt, Cause::Untracked),
                    (false, false) => (Action::Modify, Cause::Untracked),
                };
                PlanEntry {
                    spec: spec.clone(),
                    action,
                    cause,
                    drift,
                    observed: Some(actual),
                }
            }
        };
        entries.push(entry);
    }

    let declared: HashSet<_> = syncers.iter().map(|s| s.spec().addr()).collect();
    for addr in state.resources.keys() {
        if declared.contains(addr) {
            continue;
        }
        match addr.resource_type {
            ResourceKind::Table => {
                TableId::parse(&addr.resource_name)?;
            }
            ResourceKind::User => {
                user::parse_user_id(&addr.resource_name)?;
            }
            ResourceKind::Schema => {}
        }
        entries.push(PlanEntry {
            spec: ResourceSpec::orphaned(addr),
            action: Action::Delete,
            cause: Cause::Orphaned,
            drift: vec![],
            observed: None,
        });
    }

    Ok(entries)
}

/// Execute all actionable entries in the plan.
///
/// Adoptions and creates in manifest order (schemas before the tables that
/// use them), then modifies, then deletes in reverse. State is flushed after
/// each successful round trip and never before.
pub async fn execute(
    entries: &[PlanEntry],
    syncers: &[Box<dyn ResourceSyncer>],
    client: &PinotClient,
    state: &mut ProvisionerState,
    persistence: &StatePersistence,
) -> Result<ExecutionReport, ProvisionerError> {
    let by_addr = syncer_map(syncers);
    let lookup = |addr: &ResourceAddr| {
        by_addr
            .get(addr)
            .copied()
            .ok_or_else(|| ProvisionerError::ResourceNotFound {
                resource_type: addr.resource_type.to_string(),
                resource_id: addr.resource_name.clone(),
            })
    };
    let mut report = ExecutionReport::default();

    // Adoptions
    for entry in entries.iter().filter(|e| e.action == Action::Adopt) {
        let addr = entry.spec.addr();
        tracing::info!(addr = %addr, "adopting existing resource");
        let status = ResourceStatus::Planned.transition(&addr, ResourceStatus::Present)?;
        state.resources.insert(
            addr.clone(),
            ResourceState {
                resource_type: addr.resource_type,
                resource_id: addr.resource_name.clone(),
                status,
                properties: entry.observed.clone().unwrap_or_else(|| entry.spec.desired.clone()),
                applied: Some(entry.spec.desired.clone()),
                secret: None,
            },
        );
        persistence.flush(state).await?;
        report.adopted.push(addr);
    }

    // Creates
    for entry in entries.iter().filter(|e| e.action == Action::Create) {
        let addr = entry.spec.addr();
        let syncer = lookup(&addr)?;

        tracing::info!(addr = %addr, "creating resource");
        let status = ResourceStatus::Planned.transition(&addr, ResourceStatus::Creating)?;
        let result = syncer.create().await?;
        let status = status.transition(&addr, ResourceStatus::Present)?;

        let previous = state.resources.remove(&addr).and_then(|rs| rs.secret);
        state.resources.insert(
            addr.clone(),
            ResourceState {
                resource_type: addr.resource_type,
                resource_id: addr.resource_name.clone(),
                status,
                properties: result.properties,
                applied: Some(entry.spec.desired.clone()),
                secret: result.secret.apply(previous),
            },
        );
        persistence.flush(state).await?;
        report.warnings.extend(result.warnings);
        report.created.push(addr);
    }

    // Modifies
    for entry in entries.iter().filter(|e| e.action == Action::Modify) {
        let addr = entry.spec.addr();
        let syncer = lookup(&addr)?;

        let current = match state.get(&addr) {
            Some(rs) => rs.status,
            None => ResourceStatus::Planned.transition(&addr, ResourceStatus::Present)?,
        };
        tracing::info!(addr = %addr, drift = entry.drift.len(), "updating resource");
        let status = current.transition(&addr, ResourceStatus::Updating)?;
        let result = syncer.update().await?;
        let status = status.transition(&addr, ResourceStatus::Present)?;

        let previous = state.resources.remove(&addr).and_then(|rs| rs.secret);
        state.resources.insert(
            addr.clone(),
            ResourceState {
                resource_type: addr.resource_type,
                resource_id: addr.resource_name.clone(),
                status,
                properties: result.properties,
                applied: Some(entry.spec.desired.clone()),
                secret: result.secret.apply(previous),
            },
        );
        persistence.flush(state).await?;
        report.warnings.extend(result.warnings);
        report.modified.push(addr);
    }

    // Deletes, dependents first
    for entry in entries
        .iter()
        .filter(|e| e.action == Action::Delete)
        .rev()
    {
        let addr = entry.spec.addr();
        destroy_tracked(&addr, by_addr.get(&addr).copied(), client, state, persistence).await?;
        report.deleted.push(addr);
    }

    for warning in &report.warnings {
        tracing::warn!(warning = %warning, "completed with warning");
    }
    Ok(report)
}

/// Destroy every tracked resource: users, then tables, then schemas.
pub async fn destroy_all(
    syncers: &[Box<dyn ResourceSyncer>],
    client: &PinotClient,
    state: &mut ProvisionerState,
    persistence: &StatePersistence,
) -> Result<Vec<ResourceAddr>, ProvisionerError> {
    let by_addr = syncer_map(syncers);
    let tracked: Vec<ResourceAddr> = state.resources.keys().rev().cloned().collect();
    let mut deleted = Vec::new();

    for addr in tracked {
        destroy_tracked(&addr, by_addr.get(&addr).copied(), client, state, persistence).await?;
        deleted.push(addr);
    }

    Ok(deleted)
}

async fn destroy_tracked(
    addr: &ResourceAddr,
    syncer: Option<&dyn ResourceSyncer>,
    client: &PinotClient,
    state: &mut ProvisionerState,
    persistence: &StatePersistence,
) -> Result<(), ProvisionerError> {
    let current = state
        .get(addr)
        .map(|rs| rs.status)
        .unwrap_or(ResourceStatus::Present);
    let status = current.transition(addr, ResourceStatus::Deleting)?;

    tracing::info!(addr = %addr, "destroying resource");
    match syncer {
        Some(syncer) => syncer.destroy().await?,
        None => syncers::destroy_by_addr(client, addr).await?,
    }
    status.transition(addr, ResourceStatus::Absent)?;

    state.resources.remove(addr);
    persistence.flush(state).await
}

/// Bring an existing controller object under management.
///
/// Accepted ids: a schema name, a composite table id (`events_OFFLINE`), or
/// `username|COMPONENT`. The object must exist.
pub async fn import(
    client: &PinotClient,
    kind: ResourceKind,
    id: &str,
    state: &mut ProvisionerState,
    persistence: &StatePersistence,
) -> Result<ResourceState, ProvisionerError> {
    let name = match kind {
        ResourceKind::Schema => id.trim().to_string(),
        ResourceKind::Table => TableId::parse(id.trim())?.composite(),
        ResourceKind::User => {
            let (username, component) = user::parse_user_id(id.trim())?;
            user::user_id(&username, component)
        }
    };
    if name.is_empty() {
        return Err(ProvisionerError::Manifest(format!("empty {kind} id")));
    }
    let addr = ResourceAddr::new(kind, name);
    if state.get(&addr).is_some() {
        return Err(ProvisionerError::State(format!("{addr} is already managed")));
    }

    let properties = syncers::read_by_addr(client, &addr).await?.ok_or_else(|| {
        ProvisionerError::ResourceNotFound {
            resource_type: kind.to_string(),
            resource_id: addr.resource_name.clone(),
        }
    })?;

    tracing::info!(addr = %addr, "importing resource");
    let rs = ResourceState {
        resource_type: kind,
        resource_id: addr.resource_name.clone(),
        status: ResourceStatus::Planned.transition(&addr, ResourceStatus::Present)?,
        properties,
        applied: None,
        secret: None,
    };
    state.resources.insert(addr, rs.clone());
    persistence.flush(state).await?;
    Ok(rs)
}
