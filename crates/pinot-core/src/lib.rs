//! pinot-core
//!
//! Pure domain types for Pinot controller resources: table identity,
//! schema documents, user records, and the structural JSON transforms
//! (unwrapping, secret injection and redaction) applied to them.
//! No HTTP here; every other crate in the workspace builds on these types.

pub mod credential;
pub mod error;
pub mod normalize;
pub mod schema;
pub mod table_id;
pub mod user;

pub use crate::error::CoreError;

/// An open-ended JSON object. Table configurations are kept in this shape so
/// fields unknown to this crate survive a read/write round trip.
pub type Document = serde_json::Map<String, serde_json::Value>;
