//! pinot-client
//!
//! HTTP operations against the Pinot controller REST API. Thin wrapper
//! around `reqwest`; response bodies are returned raw and shaped by
//! `pinot-core`.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;

pub use crate::client::PinotClient;
pub use crate::config::ClientConfig;
pub use crate::error::ClientError;
