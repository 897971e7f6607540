//! CLI command implementations for Tessera.

pub mod serve;
pub mod token;
