//! Controller users and the shapes the `/users/{name}` endpoint answers in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// The Pinot component a user account applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Component {
    Controller,
    Broker,
    Server,
}

impl Component {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Controller => "CONTROLLER",
            Self::Broker => "BROKER",
            Self::Server => "SERVER",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Component {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CONTROLLER" => Ok(Self::Controller),
            "BROKER" => Ok(Self::Broker),
            "SERVER" => Ok(Self::Server),
            _ => Err(CoreError::InvalidComponent(s.to_string())),
        }
    }
}

/// A controller user account.
///
/// `password` is write-only: the controller never returns it, so records
/// produced by [`disambiguate`] always carry `None`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub component: Component,
    pub role: String,
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("username", &self.username)
            .field("component", &self.component)
            .field("role", &self.role)
            .field("tables", &self.tables)
            .field("permissions", &self.permissions)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl UserRecord {
    /// `"{username}_{COMPONENT}"`, the key the controller wraps records under.
    pub fn wrapper_key(username: &str, component: Component) -> String {
        format!("{username}_{component}")
    }

    /// Compare the grant-carrying fields. `tables` and `permissions` are
    /// order-insensitive; the password is not compared.
    pub fn same_grants(&self, other: &UserRecord) -> bool {
        self.grant_differences(other).is_empty()
    }

    /// Names of the fields on which `self` and `other` disagree, in
    /// declaration order, using the same rules as [`Self::same_grants`].
    pub fn grant_differences(&self, other: &UserRecord) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.username != other.username {
            fields.push("username");
        }
        if self.component != other.component {
            fields.push("component");
        }
        if !self.role.eq_ignore_ascii_case(&other.role) {
            fields.push("role");
        }
        if !same_set(&self.tables, &other.tables) {
            fields.push("tables");
        }
        if !same_set(&self.permissions, &other.permissions) {
            fields.push("permissions");
        }
        fields
    }
}

fn same_set(a: &[String], b: &[String]) -> bool {
    let mut a: Vec<&str> = a.iter().map(String::as_str).collect();
    let mut b: Vec<&str> = b.iter().map(String::as_str).collect();
    a.sort_unstable();
    a.dedup();
    b.sort_unstable();
    b.dedup();
    a == b
}

/// Outcome of resolving a `GET /users/{name}` body.
#[derive(Debug, Clone, PartialEq)]
pub enum UserLookup {
    Found(UserRecord),
    NotFound,
    UnrecognizedShape { expected_key: String },
}

/// Resolve the user record out of one of the controller's response shapes.
///
/// Checked in order, first match wins:
/// 1. the object itself, when it has a `username` field;
/// 2. the value under `"{username}_{COMPONENT}"`;
/// 3. the only value of a single-key object.
///
/// Rule 1 must stay first: a wrapper that happens to have one key would
/// otherwise shadow a plain record.
pub fn disambiguate(raw: &Value, username: &str, component: Component) -> UserLookup {
    let expected_key = UserRecord::wrapper_key(username, component);
    let unrecognized = || UserLookup::UnrecognizedShape {
        expected_key: expected_key.clone(),
    };

    let top = match raw {
        Value::Null => return UserLookup::NotFound,
        Value::String(s) if s.trim().is_empty() => return UserLookup::NotFound,
        Value::Object(top) if top.is_empty() => return UserLookup::NotFound,
        Value::Object(top) => top,
        _ => return unrecognized(),
    };

    let candidate = if top.contains_key("username") {
        raw
    } else if let Some(wrapped) = top.get(&expected_key) {
        wrapped
    } else if top.len() == 1 {
        match top.values().next() {
            Some(only) => only,
            None => return unrecognized(),
        }
    } else {
        return unrecognized();
    };

    match record_from(candidate, component) {
        Some(record) => UserLookup::Found(record),
        None => unrecognized(),
    }
}

#[derive(Deserialize)]
struct WireUser {
    username: String,
    #[serde(default)]
    component: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    tables: Option<Vec<String>>,
    #[serde(default)]
    permissions: Option<Vec<String>>,
}

fn record_from(candidate: &Value, requested: Component) -> Option<UserRecord> {
    if !candidate.is_object() {
        return None;
    }
    let wire: WireUser = serde_json::from_value(candidate.clone()).ok()?;
    let component = match wire.component.as_deref() {
        Some(c) if !c.trim().is_empty() => c.parse().ok()?,
        _ => requested,
    };

    Some(UserRecord {
        username: wire.username,
        component,
        role: wire.role.unwrap_or_default(),
        tables: wire.tables.unwrap_or_default(),
        permissions: wire.permissions.unwrap_or_default(),
        password: None,
    })
}
