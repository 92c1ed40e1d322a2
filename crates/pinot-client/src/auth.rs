use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::config::ClientConfig;

/// How requests authenticate against the controller.
///
/// Exactly one mode is chosen per client, in this order of precedence:
/// a token already carrying a `Bearer `/`Basic ` prefix, a JWT-shaped token,
/// an opaque token (sent as pre-encoded basic credentials), a
/// username/password pair, nothing.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Header value passed through verbatim.
    Prefixed(String),
    Bearer(String),
    BasicToken(String),
    Basic { username: String, password: String },
    None,
}

impl AuthMode {
    pub fn select(config: &ClientConfig) -> Self {
        let token = config.token.as_deref().map(str::trim).unwrap_or_default();
        if !token.is_empty() {
            if token.starts_with("Bearer ") || token.starts_with("Basic ") {
                return Self::Prefixed(token.to_string());
            }
            if token.matches('.').count() >= 2 {
                return Self::Bearer(token.to_string());
            }
            return Self::BasicToken(token.to_string());
        }

        let username = config.username.clone().unwrap_or_default();
        let password = config.password.clone().unwrap_or_default();
        if username.is_empty() && password.is_empty() {
            return Self::None;
        }
        Self::Basic { username, password }
    }

    /// Value for the `Authorization` header, if any.
    pub fn header_value(&self) -> Option<String> {
        match self {
            Self::Prefixed(value) => Some(value.clone()),
            Self::Bearer(token) => Some(format!("Bearer {token}")),
            Self::BasicToken(token) => Some(format!("Basic {token}")),
            Self::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{username}:{password}"));
                Some(format!("Basic {encoded}"))
            }
            Self::None => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Prefixed(_) => "prefixed",
            Self::Bearer(_) => "bearer",
            Self::BasicToken(_) => "basic_token",
            Self::Basic { .. } => "basic",
            Self::None => "none",
        }
    }
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthMode::{}", self.kind())
    }
}
