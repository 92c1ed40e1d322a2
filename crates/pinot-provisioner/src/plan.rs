use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::manifest::{FieldDrift, ResourceSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Ok,
    /// Exists and matches, but is not tracked yet.
    Adopt,
    Create,
    Modify,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cause {
    InSync,
    FirstProvision,
    /// Tracked, but the controller no longer has it.
    Missing,
    Untracked,
    Drift,
    Orphaned,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanEntry {
    pub spec: ResourceSpec,
    pub action: Action,
    pub cause: Cause,
    pub drift: Vec<FieldDrift>,
    /// The read the entry was planned from.
    #[serde(skip)]
    pub observed: Option<Value>,
}

impl PlanEntry {
    pub fn is_change(&self) -> bool {
        self.action != Action::Ok
    }
}

impl fmt::Display for PlanEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let symbol = match self.action {
            Action::Ok => " ",
            Action::Adopt => "=",
            Action::Create => "+",
            Action::Modify => "~",
            Action::Delete => "-",
        };
        write!(f, "{symbol} {} ({:?})", self.spec.addr(), self.cause)?;
        for drift in &self.drift {
            write!(f, "\n    {}: {} -> {}", drift.field, drift.actual, drift.expected)?;
        }
        Ok(())
    }
}

pub fn has_changes(entries: &[PlanEntry]) -> bool {
    entries.iter().any(PlanEntry::is_change)
}
