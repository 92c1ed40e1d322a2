//! Command-line host for the Pinot provisioner.

pub mod cli;
pub mod commands;
