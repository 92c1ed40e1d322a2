use pinot_client::ClientError;
use pinot_core::CoreError;
use thiserror::Error;

use crate::state::ResourceStatus;

#[derive(Debug, Error)]
pub enum ProvisionerError {
    #[error("resource not found: {resource_type}/{resource_id}")]
    ResourceNotFound {
        resource_type: String,
        resource_id: String,
    },

    /// Raised before any request leaves the process.
    #[error("validation failed: {0}")]
    Validation(#[from] CoreError),

    #[error("controller error: {0}")]
    Transport(#[from] ClientError),

    #[error(
        "unrecognized user response: expected a user record or an object keyed by {expected_key}"
    )]
    UnrecognizedUserResponse { expected_key: String },

    #[error("unexpected controller response: {0}")]
    UnexpectedResponse(String),

    #[error("resource deletion failed: {0}")]
    DeleteFailed(String),

    #[error("invalid lifecycle transition for {addr}: {from:?} -> {to:?}")]
    InvalidTransition {
        addr: String,
        from: ResourceStatus,
        to: ResourceStatus,
    },

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("state error: {0}")]
    State(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProvisionerError {
    /// Prepend resource identity to the error message.
    pub fn with_resource(self, addr: &str) -> Self {
        match self {
            Self::DeleteFailed(msg) => Self::DeleteFailed(format!("{addr}: {msg}")),
            Self::UnexpectedResponse(msg) => Self::UnexpectedResponse(format!("{addr}: {msg}")),
            Self::Manifest(msg) => Self::Manifest(format!("{addr}: {msg}")),
            other => other,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Walk the full error chain and join all causes into one string.
///
/// reqwest errors keep the useful part (connection refused, timeout) in
/// their sources.
pub fn format_err_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
