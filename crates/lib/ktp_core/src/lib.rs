//! # ktp_core
//!
//! Core domain logic for KTP: credential storage, password hashing,
//! access/refresh token issuance and the password-reset lifecycle.

pub mod accounts;
pub mod auth;
pub mod clock;
pub mod config;
pub mod mail;
pub mod models;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
