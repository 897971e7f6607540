//! # tessera-server
//!
//! HTTP front end for Tessera tokens.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /token` | Issue a token for `{userId, role}` |
//! | `POST /verify` | Verify `{token}` and return its claims |
//! | `GET /public-key` | Publish the verification key (hex and PASERK) |
//! | `GET /healthz` | Liveness |
//!
//! Verification failures are reported as `401 {"error": "Invalid or expired
//! token"}` whatever the cause. Issuance failures are `500` with the error
//! message.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{AppConfig, load_config};
pub use error::ServerError;
pub use server::TokenServer;
pub use state::AppState;
