//! Domain models.
//!
//! These are internal domain types, distinct from the API request/response
//! shapes in `ktp_api::models` (which carry `#[serde(rename_all = "camelCase")]`
//! and the `status` discriminator).

pub mod auth;
pub mod user;
