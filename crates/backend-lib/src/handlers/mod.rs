// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers for the `/auth` surface and health probe.
pub mod auth;
pub mod health;
