//! Table identity.
//!
//! The controller addresses a table by its composite id `logical_FLAVOR`
//! (e.g. `events_OFFLINE`). Users declare the logical name and the flavor
//! separately; this module composes, decomposes and cross-checks the two.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// Physical mode of a table. A logical table name may exist once per flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Flavor {
    Offline,
    Realtime,
}

/// Suffixes are tried longest first.
const SUFFIX_ORDER: [Flavor; 2] = [Flavor::Realtime, Flavor::Offline];

impl Flavor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "OFFLINE",
            Self::Realtime => "REALTIME",
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Offline => "_OFFLINE",
            Self::Realtime => "_REALTIME",
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flavor {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OFFLINE" => Ok(Self::Offline),
            "REALTIME" => Ok(Self::Realtime),
            _ => Err(CoreError::InvalidFlavor(s.to_string())),
        }
    }
}

/// A fully resolved table identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableId {
    pub logical: String,
    pub flavor: Flavor,
}

impl TableId {
    pub fn new(logical: &str, flavor: Flavor) -> Result<Self, CoreError> {
        let logical = logical.trim();
        if logical.is_empty() {
            return Err(CoreError::MissingField("table_name".into()));
        }
        Ok(Self {
            logical: logical.to_string(),
            flavor,
        })
    }

    /// Parse a composite id, failing when no flavor suffix is present.
    ///
    /// A partial identity cannot address a read or delete, so callers get an
    /// error instead of a guess.
    pub fn parse(id: &str) -> Result<Self, CoreError> {
        match parse_table_id(id) {
            (logical, Some(flavor)) if !logical.is_empty() => Ok(Self {
                logical: logical.to_string(),
                flavor,
            }),
            _ => Err(CoreError::AmbiguousId(id.to_string())),
        }
    }

    /// The composite id used by the controller.
    pub fn composite(&self) -> String {
        format!("{}{}", self.logical, self.flavor.suffix())
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.logical, self.flavor.suffix())
    }
}

/// Build `"{logical}_{FLAVOR}"` from a declared name and flavor string.
pub fn derive_table_id(logical: &str, flavor: &str) -> Result<String, CoreError> {
    let flavor = flavor.parse::<Flavor>()?;
    Ok(TableId::new(logical, flavor)?.composite())
}

/// Split a composite id into its logical name and flavor.
///
/// Returns the whole input with `None` when neither suffix matches.
pub fn parse_table_id(id: &str) -> (&str, Option<Flavor>) {
    for flavor in SUFFIX_ORDER {
        if let Some(logical) = id.strip_suffix(flavor.suffix()) {
            return (logical, Some(flavor));
        }
    }
    (id, None)
}

/// Check the `tableName` / `tableType` embedded in a table configuration
/// against the declared identity.
///
/// Fields that are absent (or not strings) are accepted as-is.
pub fn validate_document_identity(
    document: &serde_json::Map<String, Value>,
    expected_id: &str,
    expected_flavor: Flavor,
) -> Result<(), CoreError> {
    if let Some(name) = document.get("tableName").and_then(Value::as_str) {
        if !name.is_empty() && name != expected_id {
            return Err(CoreError::IdentityMismatch {
                field: "tableName",
                expected: expected_id.to_string(),
                actual: name.to_string(),
            });
        }
    }

    if let Some(kind) = document.get("tableType").and_then(Value::as_str) {
        if !kind.is_empty() && !kind.eq_ignore_ascii_case(expected_flavor.as_str()) {
            return Err(CoreError::IdentityMismatch {
                field: "tableType",
                expected: expected_flavor.to_string(),
                actual: kind.to_string(),
            });
        }
    }

    Ok(())
}
