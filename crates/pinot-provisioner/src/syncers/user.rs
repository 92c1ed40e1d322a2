use pinot_client::PinotClient;
use pinot_core::CoreError;
use pinot_core::user::{disambiguate, Component, UserLookup, UserRecord};
use serde_json::Value;

use crate::addr::ResourceKind;
use crate::error::ProvisionerError;
use crate::manifest::{FieldDrift, ResourceSpec, UserDecl};
use crate::state::ResourceState;
use crate::syncer::{BoxFuture, ResourceResult, ResourceSyncer, SecretUpdate};

pub const PASSWORD_FIELD: &str = "password";

pub struct UserSyncer {
    spec: ResourceSpec,
    desired: UserRecord,
    client: PinotClient,
}

impl UserSyncer {
    pub fn new(decl: &UserDecl, client: PinotClient) -> Result<Self, ProvisionerError> {
        let username = decl.username.trim();
        if username.is_empty() {
            return Err(CoreError::MissingField("username".into()).into());
        }
        let component: Component = decl.component.parse()?;

        let desired = UserRecord {
            username: username.to_string(),
            component,
            role: decl.role.clone(),
            tables: decl.tables.clone(),
            permissions: decl.permissions.clone(),
            password: decl.password.clone().filter(|p| !p.is_empty()),
        };
        let spec = ResourceSpec {
            resource_type: ResourceKind::User,
            resource_name: user_id(username, component),
            desired: public_value(&desired)?,
        };
        Ok(Self {
            spec,
            desired,
            client,
        })
    }
}

impl ResourceSyncer for UserSyncer {
    fn spec(&self) -> &ResourceSpec {
        &self.spec
    }

    fn read(&self) -> BoxFuture<'_, Result<Option<Value>, ProvisionerError>> {
        Box::pin(read_user(
            &self.client,
            &self.desired.username,
            self.desired.component,
        ))
    }

    fn diff(&self, actual: &Value, tracked: Option<&ResourceState>) -> Vec<FieldDrift> {
        let Ok(record) = serde_json::from_value::<UserRecord>(actual.clone()) else {
            return vec![FieldDrift {
                field: "user".into(),
                expected: self.spec.desired.clone(),
                actual: actual.clone(),
            }];
        };

        let field_of = |doc: &Value, field: &str| doc.get(field).cloned().unwrap_or(Value::Null);
        let mut drift: Vec<FieldDrift> = self
            .desired
            .grant_differences(&record)
            .into_iter()
            .map(|field| FieldDrift {
                field: field.into(),
                expected: field_of(&self.spec.desired, field),
                actual: field_of(actual, field),
            })
            .collect();

        // An undeclared password leaves the remote one alone.
        if let Some(password) = self.desired.password.as_deref() {
            let secret = tracked.and_then(|rs| rs.secret.as_deref());
            if secret != Some(password) {
                drift.push(FieldDrift::sensitive(PASSWORD_FIELD, secret.is_some()));
            }
        }
        drift
    }

    /// A password is required here. The record is re-read afterwards; if that
    /// read comes back empty the submitted record (minus password) is kept.
    fn create(&self) -> BoxFuture<'_, Result<ResourceResult, ProvisionerError>> {
        Box::pin(async {
            let Some(password) = self.desired.password.clone() else {
                return Err(CoreError::MissingField("password".into()).into());
            };
            self.client.create_user(&self.desired).await?;

            let properties = match read_user(
                &self.client,
                &self.desired.username,
                self.desired.component,
            )
            .await
            {
                Ok(Some(found)) => found,
                Ok(None) => self.spec.desired.clone(),
                Err(e) => {
                    tracing::warn!(user = %self.spec.resource_name, error = %e, "re-read after create failed");
                    self.spec.desired.clone()
                }
            };
            Ok(ResourceResult {
                properties,
                secret: SecretUpdate::Set(password),
                warnings: vec![],
            })
        })
    }

    fn update(&self) -> BoxFuture<'_, Result<ResourceResult, ProvisionerError>> {
        Box::pin(async {
            self.client.update_user(&self.desired).await?;
            Ok(ResourceResult {
                properties: self.spec.desired.clone(),
                secret: match &self.desired.password {
                    Some(password) => SecretUpdate::Set(password.clone()),
                    None => SecretUpdate::Keep,
                },
                warnings: vec![],
            })
        })
    }

    fn destroy(&self) -> BoxFuture<'_, Result<(), ProvisionerError>> {
        Box::pin(delete_user(
            &self.client,
            &self.desired.username,
            self.desired.component,
        ))
    }
}

/// `"{username}|{COMPONENT}"`, the id users are tracked and imported by.
pub fn user_id(username: &str, component: Component) -> String {
    format!("{username}|{component}")
}

pub fn parse_user_id(id: &str) -> Result<(String, Component), ProvisionerError> {
    let (username, component) = id.rsplit_once('|').ok_or_else(|| {
        ProvisionerError::Manifest(format!(
            "user id {id:?} must have the form username|COMPONENT"
        ))
    })?;
    if username.is_empty() {
        return Err(CoreError::MissingField("username".into()).into());
    }
    Ok((username.to_string(), component.parse()?))
}

/// The record as it may be stored: no password.
fn public_value(record: &UserRecord) -> Result<Value, ProvisionerError> {
    let mut public = record.clone();
    public.password = None;
    Ok(serde_json::to_value(public)?)
}

pub(crate) async fn read_user(
    client: &PinotClient,
    username: &str,
    component: Component,
) -> Result<Option<Value>, ProvisionerError> {
    let raw = match client.get_user(username, component).await {
        Ok(raw) => raw,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    match disambiguate(&raw, username, component) {
        UserLookup::Found(record) => Ok(Some(public_value(&record)?)),
        UserLookup::NotFound => Ok(None),
        UserLookup::UnrecognizedShape { expected_key } => {
            Err(ProvisionerError::UnrecognizedUserResponse { expected_key })
        }
    }
}

pub(crate) async fn delete_user(
    client: &PinotClient,
    username: &str,
    component: Component,
) -> Result<(), ProvisionerError> {
    match client.delete_user(username, component).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => {
            tracing::debug!(user = username, component = %component, "user already absent");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
