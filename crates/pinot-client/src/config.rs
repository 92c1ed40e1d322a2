use std::env;
use std::fmt;
use std::time::Duration;

use crate::error::ClientError;

pub const ENV_CONTROLLER_URL: &str = "PINOT_CONTROLLER_URL";
pub const ENV_USERNAME: &str = "PINOT_USERNAME";
pub const ENV_PASSWORD: &str = "PINOT_PASSWORD";
pub const ENV_TOKEN: &str = "PINOT_TOKEN";
pub const ENV_DATABASE: &str = "PINOT_DATABASE";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for one controller, resolved once at startup and
/// handed to [`crate::PinotClient::new`].
#[derive(Clone, Default)]
pub struct ClientConfig {
    pub controller_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    /// Sent as the `Database` header when set.
    pub database: Option<String>,
    pub timeout: Option<Duration>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("controller_url", &self.controller_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(controller_url: impl Into<String>) -> Self {
        Self {
            controller_url: controller_url.into(),
            ..Self::default()
        }
    }

    /// Read `PINOT_CONTROLLER_URL`, `PINOT_USERNAME`, `PINOT_PASSWORD`,
    /// `PINOT_TOKEN` and `PINOT_DATABASE`. Unset or empty variables are `None`.
    pub fn from_env() -> Self {
        Self {
            controller_url: non_empty(env::var(ENV_CONTROLLER_URL).ok()).unwrap_or_default(),
            username: non_empty(env::var(ENV_USERNAME).ok()),
            password: non_empty(env::var(ENV_PASSWORD).ok()),
            token: non_empty(env::var(ENV_TOKEN).ok()),
            database: non_empty(env::var(ENV_DATABASE).ok()),
            timeout: None,
        }
    }

    /// Layer explicitly declared settings over `self`. Declared values win
    /// when they are non-empty.
    pub fn overlay(mut self, declared: ClientConfig) -> Self {
        if !declared.controller_url.trim().is_empty() {
            self.controller_url = declared.controller_url;
        }
        if let Some(v) = non_empty(declared.username) {
            self.username = Some(v);
        }
        if let Some(v) = non_empty(declared.password) {
            self.password = Some(v);
        }
        if let Some(v) = non_empty(declared.token) {
            self.token = Some(v);
        }
        if let Some(v) = non_empty(declared.database) {
            self.database = Some(v);
        }
        if declared.timeout.is_some() {
            self.timeout = declared.timeout;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.controller_url.trim().is_empty() {
            return Err(ClientError::Config(format!(
                "missing controller URL: set controller_url or {ENV_CONTROLLER_URL}"
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
