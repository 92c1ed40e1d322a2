use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid table type {0:?}: expected OFFLINE or REALTIME")]
    InvalidFlavor(String),

    #[error("table id {0:?} has no _OFFLINE or _REALTIME suffix")]
    AmbiguousId(String),

    #[error("table configuration {field} must be {expected}, found {actual}")]
    IdentityMismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },

    #[error("schema_name ({declared}) must match schemaName in the document ({document})")]
    NameMismatch { declared: String, document: String },

    #[error("kafka credentials incomplete: {0}")]
    IncompleteCredentials(String),

    #[error("invalid component {0:?}: expected CONTROLLER, BROKER or SERVER")]
    InvalidComponent(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Identity, name and type disagreements. These are always raised before
    /// any request leaves the process.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidFlavor(_)
                | Self::AmbiguousId(_)
                | Self::IdentityMismatch { .. }
                | Self::NameMismatch { .. }
                | Self::InvalidComponent(_)
                | Self::MissingField(_)
        )
    }
}
