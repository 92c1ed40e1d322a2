use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::addr::{ResourceAddr, ResourceKind};
use crate::error::ProvisionerError;

/// Provisioner state, persisted as JSON next to the manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvisionerState {
    /// Controller the resources live on, recorded on every flush.
    #[serde(default)]
    pub controller: String,

    pub resources: BTreeMap<ResourceAddr, ResourceState>,
}

impl ProvisionerState {
    pub fn get(&self, addr: &ResourceAddr) -> Option<&ResourceState> {
        self.resources.get(addr)
    }

    pub fn secret(&self, addr: &ResourceAddr) -> Option<&str> {
        self.resources.get(addr).and_then(|rs| rs.secret.as_deref())
    }
}

/// State for a single managed resource.
///
/// `properties` is the redacted document as last read or written. The
/// generated SASL credential or user password lives in `secret` and never
/// inside `properties`.
#[derive(Clone, Serialize, Deserialize)]
pub struct ResourceState {
    pub resource_type: ResourceKind,
    pub resource_id: String,
    pub status: ResourceStatus,
    pub properties: Value,
    /// The declared document as last written or adopted. Refresh leaves it
    /// alone; it is how keys dropped from the manifest are noticed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl fmt::Debug for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ResourceState")
            .field("resource_type", &self.resource_type)
            .field("resource_id", &self.resource_id)
            .field("status", &self.status)
            .field("properties", &self.properties)
            .field("applied", &self.applied)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ResourceState {
    pub fn addr(&self) -> ResourceAddr {
        ResourceAddr::new(self.resource_type, self.resource_id.clone())
    }
}

/// Lifecycle of one resource instance:
///
/// ```text
/// Planned ─► Creating ─► Present ─► Deleting ─► Absent
///    │                    ▲   │
///    └──── (import) ──────┘   ├─► Updating ─► Present
///                             └─► Absent   (gone remotely)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Planned,
    Creating,
    Present,
    Updating,
    Deleting,
    Absent,
}

impl ResourceStatus {
    pub fn can_transition_to(self, next: ResourceStatus) -> bool {
        use ResourceStatus::*;
        matches!(
            (self, next),
            (Planned, Creating)
                | (Planned, Present)
                | (Creating, Present)
                | (Present, Updating)
                | (Present, Deleting)
                | (Present, Absent)
                | (Updating, Present)
                | (Deleting, Absent)
        )
    }

    /// Move to `next`, or fail with [`ProvisionerError::InvalidTransition`].
    pub fn transition(
        self,
        addr: &ResourceAddr,
        next: ResourceStatus,
    ) -> Result<ResourceStatus, ProvisionerError> {
        if !self.can_transition_to(next) {
            return Err(ProvisionerError::InvalidTransition {
                addr: addr.to_string(),
                from: self,
                to: next,
            });
        }
        tracing::debug!(addr = %addr, from = ?self, to = ?next, "lifecycle transition");
        Ok(next)
    }
}
