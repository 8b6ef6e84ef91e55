//! Session core: identity-provider login, signed session and renewal tokens,
//! renewal-id revocation and role-based authorization.
//!
//! ## Flows
//!
//! - **login**: provider profile -> role -> session or signup token
//! - **authenticate**: session token -> [`models::AuthenticatedUser`]
//! - **refresh**: live renewal token -> new session token
//! - **logout**: delete the renewal id so the renewal token stops working
//!
//! [`context::SessionContext`] wires all of them from [`config::Settings`].
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod models;
pub mod revocation;
pub mod security;
pub mod services;

pub use context::SessionContext;
pub use error::{AuthOutcome, Result, SessionError};
